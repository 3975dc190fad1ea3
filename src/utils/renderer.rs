use anyhow::anyhow;
use liquid::ParserBuilder;
use serde::Serialize;

/// Render a Liquid template with the fields of `values` as globals
pub fn render<T: Serialize>(template: &str, values: &T) -> anyhow::Result<String> {
    let template = ParserBuilder::with_stdlib()
        .build()
        .map_err(|e| anyhow!("Unable to build template parser: {}", e))?
        .parse(template)
        .map_err(|e| anyhow!("Unable to parse template: {}", e))?;

    let globals =
        liquid::to_object(values).map_err(|e| anyhow!("Unable to convert template values: {}", e))?;

    template
        .render(&globals)
        .map_err(|e| anyhow!("Unable to render template: {}", e))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Values {
        name: String,
        scores: Vec<f64>,
    }

    #[test]
    fn test_render() {
        let values = Values {
            name: "demo".to_string(),
            scores: vec![0.12345, 0.5],
        };

        let output = render(
            "{{ name }}:{% for s in scores %} {{ s | round: 2 }}{% endfor %}",
            &values,
        )
        .unwrap();

        assert_eq!(output, "demo: 0.12 0.5");
    }
}
