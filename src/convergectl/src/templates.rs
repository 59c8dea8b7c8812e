//! Templates compiled into the binary, so a deployed convergectl works when
//! only the executable is available on the host.

/// Homepage rendered by the webserver recipe.
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>{{ title }}</title>
  </head>
  <body>
    <h1>{{ title }}</h1>
    <p>Served from a {{ platform }} host converged by convergectl.</p>
  </body>
</html>
"#;

/// All embedded templates, keyed by the name resources reference.
pub const ALL_TEMPLATES: &[(&str, &str)] = &[("index.html", INDEX_HTML)];
