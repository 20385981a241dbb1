//! Shared helpers for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;
use winelabel::{ModelClient, ModelRequest, WineLabelError};

/// A `ModelClient` that replays canned replies in order and records every
/// request it receives.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, WineLabelError>>>,
    pub requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<String, WineLabelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, idx: usize) -> ModelRequest {
        self.requests.lock().unwrap()[idx].clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> Result<String, WineLabelError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(WineLabelError::Internal("no scripted reply left".into())))
    }
}

/// A small but real JPEG, base64-encoded.
pub fn jpeg_base64() -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 48, Rgb([200, 190, 160])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("jpeg encode");
    STANDARD.encode(buf)
}

pub const EXTRACTED_JSON: &str = r#"{
  "producer": "Chateau X",
  "wine_name": null,
  "vintage": "2016",
  "region": "Bordeaux",
  "country": "France",
  "grapes": ["Merlot", "Cabernet Franc"],
  "appellation": "Saint-Émilion Grand Cru",
  "abv": "14% vol",
  "label_text": "CHATEAU X\nSAINT-ÉMILION GRAND CRU\n2016",
  "confidence": 0.88
}"#;

pub const ENRICHED_JSON: &str = r#"{
  "overview": "A Merlot-led Right Bank red.",
  "style": "Medium-full bodied, ripe, supple tannins",
  "tasting_notes": {"nose": "Plum, cedar", "palate": "Black cherry, cocoa", "finish": "Medium-long"},
  "food_pairings": ["Roast duck", "Mushroom risotto"],
  "serving": {"temperature": "16–18°C", "decanting": "30–60 minutes", "glassware": "Bordeaux glass"},
  "aging_window": "Typically drinks well 2024–2035",
  "producer_background": null,
  "region_background": "Saint-Émilion sits on limestone and clay slopes.",
  "price_context": null,
  "uncertainties": ["Exact blend proportions are not on the label."],
  "follow_up_questions": ["Is this the grand vin or a second wine?"]
}"#;
