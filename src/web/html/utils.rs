use html_minifier::HTMLMinifier;
use tera::{Context, Tera};
use thiserror::Error;
use tide::log::error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("rendering error")]
    Tera(#[from] tera::Error),
}

pub trait Renderer: std::fmt::Debug + Send + Sync {
    fn render(&self, template: &str, context: &Context) -> Result<String, TemplateError>;
}

/// Renders tera templates and minifies the result.
#[derive(Debug)]
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    pub fn new(tera: Tera) -> Self {
        TeraRenderer { tera }
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, template: &str, context: &Context) -> Result<String, TemplateError> {
        let rendered = self.tera.render(template, context)?;

        let mut html_minifier = HTMLMinifier::new();
        if let Err(err) = html_minifier.digest(&rendered) {
            error!("Failed to minify HTML: {}", err);
            return Ok(rendered);
        };

        let minified = match std::str::from_utf8(html_minifier.get_html()) {
            Ok(minified) => minified.to_string(),
            Err(err) => {
                error!("Failed to parse minified HTML as UTF-8: {}", err);
                rendered
            },
        };

        Ok(minified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_and_minifies() {
        let mut tera = Tera::default();
        tera.add_raw_template(
            "hello.html",
            "<p>\n    hello   {{ name }}\n</p>\n",
        )
        .unwrap();
        let renderer = TeraRenderer::new(tera);

        let mut context = Context::new();
        context.insert("name", "<world>");
        let body = renderer.render("hello.html", &context).unwrap();

        assert!(body.contains("hello"));
        assert!(body.contains("&lt;world&gt;"));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let renderer = TeraRenderer::new(Tera::default());
        assert!(matches!(
            renderer.render("missing.html", &Context::new()),
            Err(TemplateError::Tera(_))
        ));
    }
}
