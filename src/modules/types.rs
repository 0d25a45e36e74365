use std::path::{Path, PathBuf};

use derive_more::with_trait::Display;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::modules::contract::PROFILE_FIELDS;

/// Bootstrap contextual class used for badges, banners and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[display("success")]
    Success,
    #[display("danger")]
    Danger,
    #[display("warning")]
    Warning,
    #[display("info")]
    Info,
    #[display("secondary")]
    Secondary,
}

/// Reply envelope shared by every dashboard endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiReply<T> {
    /// A reply without the flag counts as a failure.
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(alias = "analysis")]
    pub data: Option<T>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProfileData {
    #[serde(default)]
    pub follower_count: Option<Value>,
    #[serde(default)]
    pub following_count: Option<Value>,
    #[serde(default)]
    pub post_count: Option<Value>,
    #[serde(default)]
    pub engagement_rate: Option<Value>,
    #[serde(default)]
    pub bio: Option<Value>,
    #[serde(default)]
    pub profile_pic_url: Option<String>,
}

impl ProfileData {
    fn raw(&self, field: &str) -> Option<&Value> {
        match field {
            "follower_count" => self.follower_count.as_ref(),
            "following_count" => self.following_count.as_ref(),
            "post_count" => self.post_count.as_ref(),
            "engagement_rate" => self.engagement_rate.as_ref(),
            "bio" => self.bio.as_ref(),
            _ => None,
        }
    }

    /// The fields present in the reply, rendered the way an input shows them.
    pub fn present_fields(&self) -> Vec<(&'static str, String)> {
        PROFILE_FIELDS
            .iter()
            .filter_map(|field| self.raw(field).map(|value| (*field, input_text(value))))
            .collect()
    }
}

/// Renders a JSON value the way the page shows it: strings unquoted, `null`
/// as nothing.
pub fn input_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Analysis relayed from the AI service. Fields are taken as they come:
/// `null` reads as the default and the score keeps its JSON form.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ContentAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentiment: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub brand_mentioned: bool,
    #[serde(default)]
    pub quality_score: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub brand_safe: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendation: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issues: Vec<String>,
}

/// A file picked in a file input, with the MIME type the picker declared.
#[derive(Debug, Clone, Display, PartialEq)]
#[display("{name} ({mime_type})")]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    pub path: PathBuf,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            path: path.into(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = guess_mime(path).map(|m| m.to_string()).unwrap_or_default();
        Self::new(name, mime_type, path)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

fn guess_mime(path: &Path) -> Option<mime::Mime> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let guessed = match ext.as_str() {
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "bmp" => mime::IMAGE_BMP,
        "svg" => mime::IMAGE_SVG,
        "webp" => "image/webp".parse().ok()?,
        "mp4" => "video/mp4".parse().ok()?,
        "mov" => "video/quicktime".parse().ok()?,
        "webm" => "video/webm".parse().ok()?,
        "pdf" => mime::APPLICATION_PDF,
        "txt" => mime::TEXT_PLAIN,
        "json" => mime::APPLICATION_JSON,
        _ => return None,
    };
    Some(guessed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_reply_reads_data_key() {
        let reply: ApiReply<ProfileData> = serde_json::from_str(
            r#"{"success": true, "data": {"follower_count": 1200, "bio": "coffee", "engagement_rate": 3.5}}"#,
        )
        .unwrap();
        assert!(reply.success);
        let data = reply.data.unwrap();
        assert_eq!(
            data.present_fields(),
            vec![
                ("follower_count", "1200".to_string()),
                ("engagement_rate", "3.5".to_string()),
                ("bio", "coffee".to_string()),
            ]
        );
    }

    #[test]
    fn analysis_reply_reads_analysis_key() {
        let reply: ApiReply<ContentAnalysis> = serde_json::from_str(
            r#"{"success": true, "analysis": {"sentiment": "negative", "quality_score": 4, "recommendation": "reject", "issues": ["off brand"]}}"#,
        )
        .unwrap();
        let analysis = reply.data.unwrap();
        assert_eq!(analysis.sentiment, "negative");
        assert_eq!(analysis.quality_score, Value::from(4));
        assert_eq!(analysis.issues, vec!["off brand".to_string()]);
        assert!(analysis.feedback.is_none());
    }

    #[test]
    fn reply_without_success_flag_is_a_failure() {
        let reply: ApiReply<ProfileData> =
            serde_json::from_str(r#"{"message": "rate limited"}"#).unwrap();
        assert!(!reply.success);
        assert_eq!(reply.message.as_deref(), Some("rate limited"));
    }

    #[test]
    fn analysis_tolerates_nulls_and_string_scores() {
        let analysis: ContentAnalysis = serde_json::from_str(
            r#"{"sentiment": null, "brand_mentioned": null, "quality_score": "8", "brand_safe": true, "recommendation": null, "feedback": null, "issues": null}"#,
        )
        .unwrap();
        assert_eq!(analysis.sentiment, "");
        assert!(!analysis.brand_mentioned);
        assert_eq!(analysis.quality_score, Value::from("8"));
        assert!(analysis.brand_safe);
        assert_eq!(analysis.recommendation, "");
        assert!(analysis.issues.is_empty());
    }

    #[test]
    fn failure_reply_without_message() {
        let reply: ApiReply<ProfileData> = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!reply.success);
        assert!(reply.message.is_none());
        assert!(reply.data.is_none());
    }

    #[test]
    fn null_field_renders_empty() {
        let data = ProfileData {
            bio: Some(Value::Null),
            ..ProfileData::default()
        };
        assert_eq!(data.present_fields(), vec![("bio", String::new())]);
    }

    #[test]
    fn selected_file_mime_from_extension() {
        let png = SelectedFile::from_path("/tmp/shot.PNG");
        assert_eq!(png.name, "shot.PNG");
        assert_eq!(png.mime_type, "image/png");
        assert!(png.is_image());

        let clip = SelectedFile::from_path("reel.mp4");
        assert!(clip.is_video());

        let unknown = SelectedFile::from_path("notes.xyz");
        assert_eq!(unknown.mime_type, "");
        assert!(!unknown.is_image() && !unknown.is_video());
    }
}
