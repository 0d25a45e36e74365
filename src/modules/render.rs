use crate::modules::types::{ContentAnalysis, SelectedFile, Tone, input_text};

pub const LOADING_PLACEHOLDER: &str = r#"<div class="loading-spinner"></div>"#;

const PREVIEW_STYLE: &str = "max-height: 200px;";

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn sentiment_tone(sentiment: &str) -> Tone {
    match sentiment {
        "positive" => Tone::Success,
        "negative" => Tone::Danger,
        _ => Tone::Secondary,
    }
}

pub fn recommendation_tone(recommendation: &str) -> Tone {
    match recommendation {
        "approve" => Tone::Success,
        "reject" => Tone::Danger,
        _ => Tone::Warning,
    }
}

fn yes_no_badge(flag: bool) -> String {
    let (tone, label) = if flag {
        (Tone::Success, "Yes")
    } else {
        (Tone::Danger, "No")
    };
    format!(r#"<span class="badge bg-{tone}">{label}</span>"#)
}

/// Result card for one content analysis.
pub fn analysis_card(analysis: &ContentAnalysis) -> String {
    let sentiment = escape_html(&analysis.sentiment);
    let sentiment_tone = sentiment_tone(&analysis.sentiment);
    let recommendation_tone = recommendation_tone(&analysis.recommendation);
    let recommendation = escape_html(&analysis.recommendation.to_uppercase());

    let feedback = match analysis.feedback.as_deref() {
        Some(text) if !text.is_empty() => format!(
            r#"<p class="text-muted"><strong>Feedback:</strong> {}</p>"#,
            escape_html(text)
        ),
        _ => String::new(),
    };

    let issues = if analysis.issues.is_empty() {
        String::new()
    } else {
        let items: String = analysis
            .issues
            .iter()
            .map(|issue| format!("<li>{}</li>", escape_html(issue)))
            .collect();
        format!(
            r#"<div class="mt-2"><strong>Issues:</strong><ul class="mb-0">{items}</ul></div>"#
        )
    };

    format!(
        r#"<div class="card">
  <div class="card-header">
    <h6 class="mb-0"><i class="bi bi-robot"></i> AI Content Analysis</h6>
  </div>
  <div class="card-body">
    <div class="row">
      <div class="col-md-6">
        <p><strong>Sentiment:</strong> <span class="badge bg-{sentiment_tone}">{sentiment}</span></p>
        <p><strong>Brand Mentioned:</strong> {brand_mentioned}</p>
      </div>
      <div class="col-md-6">
        <p><strong>Quality Score:</strong> {score}/10</p>
        <p><strong>Brand Safe:</strong> {brand_safe}</p>
      </div>
    </div>
    <div class="alert alert-{recommendation_tone} mt-3"><strong>Recommendation:</strong> {recommendation}</div>
    {feedback}
    {issues}
  </div>
</div>"#,
        brand_mentioned = yes_no_badge(analysis.brand_mentioned),
        brand_safe = yes_no_badge(analysis.brand_safe),
        score = escape_html(&input_text(&analysis.quality_score)),
    )
}

/// Preview markup for a selected file, chosen by its declared MIME type.
pub fn file_preview(file: &SelectedFile, data_url: &str) -> String {
    let src = escape_html(data_url);
    if file.is_image() {
        format!(r#"<img src="{src}" class="img-fluid rounded" style="{PREVIEW_STYLE}">"#)
    } else if file.is_video() {
        format!(
            r#"<video src="{src}" class="img-fluid rounded" style="{PREVIEW_STYLE}" controls></video>"#
        )
    } else {
        format!(
            r#"<div class="alert alert-info">File selected: {}</div>"#,
            escape_html(&file.name)
        )
    }
}

/// Body of a dismissible notification banner.
pub fn alert_body(message: &str) -> String {
    format!(
        r#"{}<button type="button" class="btn-close" data-bs-dismiss="alert"></button>"#,
        escape_html(message)
    )
}

pub fn alert_class(tone: Tone) -> String {
    format!("alert alert-{tone} alert-dismissible fade show")
}
