//! The default project every workspace preview starts from, and file-map
//! merging.

use zflow_types::models::{FileEntry, FileMap};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <script src="https://cdn.tailwindcss.com"></script>
  </head>
  <body>
    <div id="root"></div>
  </body>
</html>
"#;

const APP_CSS: &str = r#"@tailwind base;
@tailwind components;
@tailwind utilities;
"#;

const TAILWIND_CONFIG: &str = r#"/** @type {import('tailwindcss').Config} */
module.exports = {
  content: ["./src/**/*.{js,jsx,ts,tsx}"],
  theme: {
    extend: {},
  },
  plugins: [],
}
"#;

const POSTCSS_CONFIG: &str = r#"/** @type {import('postcss-load-config').Config} */
const config = {
  plugins: {
    tailwindcss: {},
  },
};

export default config;
"#;

pub fn default_scaffold() -> FileMap {
    [
        ("/public/index.html", INDEX_HTML),
        ("/App.css", APP_CSS),
        ("/tailwind.config.js", TAILWIND_CONFIG),
        ("/postcss.config.js", POSTCSS_CONFIG),
    ]
    .into_iter()
    .map(|(path, code)| (path.to_string(), FileEntry::new(code)))
    .collect()
}

/// Copy of `base` with every entry of `overlay` written over it.
pub fn merge_files(base: &FileMap, overlay: &FileMap) -> FileMap {
    let mut merged = base.clone();
    merged.extend(overlay.iter().map(|(path, entry)| (path.clone(), entry.clone())));
    merged
}

/// What the preview renders: stored files over the default scaffold.
pub fn with_scaffold(stored: Option<&FileMap>) -> FileMap {
    match stored {
        Some(files) => merge_files(&default_scaffold(), files),
        None => default_scaffold(),
    }
}
