//! Content-type detection from package identity and on-screen text.
//!
//! Rules run top to bottom and the first match wins.

use crate::models::ContentType;

const VIDEO_PACKAGES: &[&str] = &[
    "youtube",
    "netflix",
    "tiktok",
    "musically",
    "twitch",
    "primevideo",
    "avod",
    "hotstar",
    "vimeo",
    "disney",
];

/// Platforms that mix video with other content; only text hints decide.
const MIXED_MEDIA_PACKAGES: &[&str] = &["instagram", "facebook", "snapchat", "twitter", "reddit"];
const MIXED_MEDIA_VIDEO_HINTS: &[&str] = &["reel", "video"];

const MEDIA_SURFACE_CLASSES: &[&str] = &[
    "videoview",
    "surfaceview",
    "textureview",
    "playerview",
    "exoplayer",
];

const SHOPPING_HINTS: &[&str] = &["$", "₹", "€", "£", "add to cart", "buy now", "price"];
const NEWS_HINTS: &[&str] = &["breaking", "headline", "news"];
const IMAGE_HINTS: &[&str] = &["photo", "image", "gallery"];
const LONG_FORM_HINTS: &[&str] = &["comment", "read more"];
const LONG_FORM_MIN_CHARS: usize = 200;

const IMAGE_PACKAGES: &[&str] = &["instagram", "pinterest", "photos", "gallery", "camera"];
const SHOPPING_PACKAGES: &[&str] = &["amazon", "flipkart", "ebay", "shop", "myntra", "aliexpress"];

pub fn detect_content_type(package_id: &str, text: &str, node_classes: &[String]) -> ContentType {
    let package = package_id.to_lowercase();
    let lowered = text.to_lowercase();

    if contains_any(&package, VIDEO_PACKAGES) {
        return ContentType::Video;
    }
    if contains_any(&package, MIXED_MEDIA_PACKAGES) && contains_any(&lowered, MIXED_MEDIA_VIDEO_HINTS) {
        return ContentType::Video;
    }
    if node_classes
        .iter()
        .any(|class| contains_any(&class.to_lowercase(), MEDIA_SURFACE_CLASSES))
    {
        return ContentType::Video;
    }
    if contains_any(&lowered, SHOPPING_HINTS) {
        return ContentType::Shopping;
    }
    if contains_any(&lowered, NEWS_HINTS) {
        return ContentType::News;
    }
    if contains_any(&lowered, IMAGE_HINTS) {
        return ContentType::Image;
    }
    if contains_any(&lowered, LONG_FORM_HINTS) || text.chars().count() > LONG_FORM_MIN_CHARS {
        return ContentType::Text;
    }
    if contains_any(&package, IMAGE_PACKAGES) {
        return ContentType::Image;
    }
    if contains_any(&package, SHOPPING_PACKAGES) {
        return ContentType::Shopping;
    }
    ContentType::Other
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
