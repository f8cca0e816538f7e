//! HTML conversion form served at `/`.

use axum::{extract::State, response::Html};
use phono_core::format::{
    NumericRange, ParameterDomain, BIT_DEPTH, BIT_RATE, BIT_RATE_MODE, CHANNEL_MODE, QUALITY,
    USE_QUALITY, VBR_QUALITY,
};
use phono_core::{FormatRegistry, LimitsConfig};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use super::convert::{FORMAT_FIELD, INPUT_FILE_FIELD};
use crate::state::AppState;

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render(state.registry(), state.limits()))
}

/// Renders the form from the registry, so it only offers what the server accepts.
pub fn render(registry: &FormatRegistry, limits: &LimitsConfig) -> String {
    let accept: Vec<&str> = registry
        .formats()
        .iter()
        .flat_map(|f| f.extensions().iter().copied())
        .collect();

    // Extension -> max bytes, for the client-side size check.
    let mut max_sizes = BTreeMap::new();
    for format in registry.formats() {
        if let Some(limit) = limits.limit_for(format.name()) {
            for ext in format.extensions() {
                max_sizes.insert(ext.to_string(), limit);
            }
        }
    }
    let max_sizes = serde_json::to_string(&max_sizes).unwrap_or_else(|_| "{}".to_string());

    let mut format_options = String::new();
    let mut fieldsets = String::new();
    for format in registry.output_formats() {
        let _ = write!(
            format_options,
            r#"<option value="{ext}">{name}</option>"#,
            ext = format.default_extension(),
            name = format.name().to_uppercase(),
        );
        if let Some(domain) = format.domain() {
            fieldsets.push_str(&domain_fieldset(format.default_extension(), domain));
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>phono</title>
<style>
body {{ font-family: sans-serif; max-width: 40em; margin: 2em auto; }}
fieldset {{ margin: 1em 0; }}
label {{ display: block; margin: 0.4em 0; }}
</style>
</head>
<body>
<h1>Convert audio</h1>
<form id="convert" method="post" enctype="multipart/form-data">
<label>Input file <input type="file" name="{input_field}" accept="{accept}" required></label>
<label>Output format <select name="{format_field}" id="output-format">{format_options}</select></label>
{fieldsets}
<button type="submit">Convert</button>
<p id="error" role="alert"></p>
</form>
<script>
const maxSizes = {max_sizes};
const form = document.getElementById("convert");
const select = document.getElementById("output-format");
function showParams() {{
  for (const set of form.querySelectorAll("fieldset[data-format]")) {{
    const active = set.dataset.format === select.value;
    set.hidden = !active;
    set.disabled = !active;
  }}
}}
select.addEventListener("change", showParams);
showParams();
form.addEventListener("submit", (event) => {{
  const file = form.elements["{input_field}"].files[0];
  const error = document.getElementById("error");
  error.textContent = "";
  if (!file) {{ event.preventDefault(); return; }}
  const dot = file.name.lastIndexOf(".");
  const ext = dot >= 0 ? file.name.slice(dot).toLowerCase() : "";
  const max = maxSizes[ext];
  if (max !== undefined && file.size > max) {{
    event.preventDefault();
    error.textContent = "File is larger than the " + max + " byte limit for " + ext;
    return;
  }}
  form.action = "/api/v1/convert/" + encodeURIComponent(file.name);
}});
</script>
</body>
</html>
"#,
        input_field = INPUT_FILE_FIELD,
        format_field = FORMAT_FIELD,
        accept = accept.join(","),
    )
}

fn domain_fieldset(extension: &str, domain: &ParameterDomain) -> String {
    let mut html = format!(r#"<fieldset data-format="{}">"#, extension);
    match domain {
        ParameterDomain::Wav(wav) => {
            html.push_str("<legend>WAV</legend>");
            let options: String = wav
                .bit_depths
                .iter()
                .map(|depth| {
                    let selected = if *depth == 16 { " selected" } else { "" };
                    format!(r#"<option value="{0}"{1}>{0}-bit</option>"#, depth, selected)
                })
                .collect();
            let _ = write!(
                html,
                r#"<label>Bit depth <select name="{}">{}</select></label>"#,
                BIT_DEPTH, options
            );
        }
        ParameterDomain::Mp3(mp3) => {
            html.push_str("<legend>MP3</legend>");
            let modes: String = mp3
                .rate_controls
                .iter()
                .map(|mode| format!(r#"<option value="{0}">{0}</option>"#, mode.as_str()))
                .collect();
            let _ = write!(
                html,
                r#"<label>Bit rate mode <select name="{}">{}</select></label>"#,
                BIT_RATE_MODE, modes
            );
            html.push_str(&number_input("VBR quality", VBR_QUALITY, mp3.vbr_quality, 4));
            html.push_str(&number_input("Bit rate (kbps)", BIT_RATE, mp3.bit_rate, 192));
            let channels: String = mp3
                .channel_modes
                .iter()
                .map(|mode| {
                    format!(
                        r#"<option value="{}">{}</option>"#,
                        mode.code(),
                        mode.label()
                    )
                })
                .collect();
            let _ = write!(
                html,
                r#"<label>Channel mode <select name="{}">{}</select></label>"#,
                CHANNEL_MODE, channels
            );
            let _ = write!(
                html,
                r#"<label><input type="checkbox" name="{}" value="true"> Set encoder quality</label>"#,
                USE_QUALITY
            );
            html.push_str(&number_input("Quality", QUALITY, mp3.quality, 5));
        }
    }
    html.push_str("</fieldset>");
    html
}

fn number_input(label: &str, name: &str, range: NumericRange, value: i64) -> String {
    format!(
        r#"<label>{label} <input type="number" name="{name}" min="{min}" max="{max}" value="{value}"></label>"#,
        label = label,
        name = name,
        min = range.min,
        max = range.max,
        value = value.clamp(range.min, range.max),
    )
}
