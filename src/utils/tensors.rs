/// Pad or truncate a token sequence to `seq_length`, returning the ids and their attention mask
pub fn pad_to(pad_token: u32, tokens: &[u32], seq_length: usize) -> (Vec<u32>, Vec<u8>) {
    let kept = tokens.len().min(seq_length);

    let mut ids = Vec::with_capacity(seq_length);
    ids.extend_from_slice(&tokens[..kept]);
    ids.resize(seq_length, pad_token);

    let mut mask = vec![1; kept];
    mask.resize(seq_length, 0);

    (ids, mask)
}
