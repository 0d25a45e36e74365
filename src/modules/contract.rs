//! Element ids, selectors and endpoint paths shared with the dashboard
//! templates and the backend.

pub const USERNAME_INPUT: &str = "id_instagram_username";
pub const FETCH_BUTTON: &str = "fetch-instagram-data";
pub const PROFILE_LOADING: &str = "instagram-loading";
pub const PROFILE_PIC_PREVIEW: &str = "profile-pic-preview";

pub const CAPTION_INPUT: &str = "id_caption_text";
pub const ANALYZE_BUTTON: &str = "analyze-content";
pub const ANALYSIS_RESULT: &str = "analysis-result";

pub const ALERT_CONTAINER: &str = "alert-container";

pub const REDEEM_MODAL: &str = "redeemModal";
pub const REDEEM_CODE_DISPLAY: &str = "redeem-code-display";
pub const CONFIRM_REDEEM_BUTTON: &str = "confirm-redeem-btn";

pub const TOOLTIP_TRIGGERS: &str = r#"[data-bs-toggle="tooltip"]"#;
pub const POPOVER_TRIGGERS: &str = r#"[data-bs-toggle="popover"]"#;
pub const ALERTS: &str = ".alert";
pub const FILE_INPUTS: &str = r#"input[type="file"]"#;
pub const FILE_PREVIEW: &str = ".file-preview";
pub const CLAIM_BUTTONS: &str = ".claim-offer-btn";
pub const REDEEM_BUTTONS: &str = ".redeem-offer-btn";
pub const ANCHOR_LINKS: &str = r##"a[href^="#"]"##;

/// Profile fields copied into `id_<field>` inputs, in this order.
pub const PROFILE_FIELDS: [&str; 5] = [
    "follower_count",
    "following_count",
    "post_count",
    "engagement_rate",
    "bio",
];

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

pub const FETCH_PROFILE_PATH: &str = "/dashboard/ajax/fetch-instagram-data/";
pub const ANALYZE_CONTENT_PATH: &str = "/dashboard/ajax/analyze-content/";
/// `{offer_id}` is substituted with the offer's id.
pub const CLAIM_OFFER_PATH: &str = "/dashboard/offers/{offer_id}/claim/";

pub fn profile_input_id(field: &str) -> String {
    format!("id_{field}")
}
