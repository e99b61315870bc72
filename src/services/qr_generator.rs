use base64::Engine;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use serde::Deserialize;
use std::str::FromStr;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum QrGenerationError {
    #[error("QR code generation failed: {0}")]
    QrCodeError(#[from] qrcode::types::QrError),

    #[error("PNG encoding failed: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// What a printed QR code carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrPayloadMode {
    /// The bare card token
    #[default]
    Token,
    /// A lookup URL of the form `<base>/user?code=<token>`
    Url,
}

impl FromStr for QrPayloadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "url" => Ok(Self::Url),
            other => Err(format!("unknown QR payload mode: {other}")),
        }
    }
}

/// Builds the text encoded into a card's QR code
pub fn qr_payload(
    token: &str,
    base_url: &str,
    mode: QrPayloadMode,
) -> Result<String, QrGenerationError> {
    match mode {
        QrPayloadMode::Token => Ok(token.to_string()),
        QrPayloadMode::Url => {
            let base = format!("{}/", base_url.trim_end_matches('/'));
            let mut url = Url::parse(&base)?.join("user")?;
            url.query_pairs_mut().append_pair("code", token);
            Ok(url.to_string())
        }
    }
}

fn build_code(payload: &str) -> Result<QrCode, QrGenerationError> {
    Ok(QrCode::with_error_correction_level(
        payload.as_bytes(),
        EcLevel::M,
    )?)
}

/// Generates a QR code SVG document for a payload
pub fn generate_qr_svg(payload: &str) -> Result<String, QrGenerationError> {
    let code = build_code(payload)?;

    let svg = code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .quiet_zone(true)
        .build();

    Ok(svg)
}

/// Generates a QR code PNG for a payload
pub fn generate_qr_png(payload: &str) -> Result<Vec<u8>, QrGenerationError> {
    use image::{ImageBuffer, Luma};

    let code = build_code(payload)?;

    // Each module is 10x10 pixels with a two-module light border
    let module_size = 10u32;
    let border = 2u32;
    let width = code.width() as u32;
    let img_size = (width + 2 * border) * module_size;

    let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_fn(img_size, img_size, |x, y| {
        let module_x = (x / module_size).checked_sub(border);
        let module_y = (y / module_size).checked_sub(border);
        match (module_x, module_y) {
            (Some(mx), Some(my)) if mx < width && my < width => {
                match code[(mx as usize, my as usize)] {
                    qrcode::types::Color::Dark => Luma([0u8]),
                    qrcode::types::Color::Light => Luma([255u8]),
                }
            }
            _ => Luma([255u8]),
        }
    });

    let mut png_data = Vec::new();
    image::DynamicImage::ImageLuma8(img).write_to(
        &mut std::io::Cursor::new(&mut png_data),
        image::ImageFormat::Png,
    )?;

    Ok(png_data)
}

/// PNG QR code as a `data:` URI for embedding in an `<img>` tag
pub fn png_data_uri(payload: &str) -> Result<String, QrGenerationError> {
    let png = generate_qr_png(payload)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);

    Ok(format!("data:image/png;base64,{encoded}"))
}
