//! Host surface contract for the gradient, cloud layer and haze overlay.

use crate::atmosphere::color::Rgb;
use crate::atmosphere::gradient::{gradient_css, haze_css, GradientStop};

/// The layers a sky effect paints besides the clouds themselves.
pub trait SkySurface {
    /// Background gradient plus a solid fallback color.
    fn set_background(&mut self, gradient: &[GradientStop], color: Rgb);
    /// Browser chrome / theme color.
    fn set_theme_color(&mut self, color: Rgb);
    /// Opacity and blur radius (px) of the cloud layer.
    fn set_cloud_layer(&mut self, opacity: f32, blur: f32);
    /// Haze overlay tint and opacity. Opacity 0 hides it.
    fn set_haze(&mut self, color: Rgb, opacity: f32);
}

/// CSS `filter` value for a cloud layer blur.
pub fn blur_filter_css(blur: f32) -> String {
    if blur > 0.0 {
        format!("blur({blur}px)")
    } else {
        "none".to_string()
    }
}

/// A surface that keeps the CSS property values a web host would assign.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CssSurface {
    pub background_image: String,
    pub background_color: String,
    pub theme_color: Option<String>,
    pub cloud_opacity: String,
    pub cloud_filter: String,
    pub haze_background: Option<String>,
    pub haze_opacity: String,
}

impl SkySurface for CssSurface {
    fn set_background(&mut self, gradient: &[GradientStop], color: Rgb) {
        self.background_image = gradient_css(gradient);
        self.background_color = color.to_string();
    }

    fn set_theme_color(&mut self, color: Rgb) {
        self.theme_color = Some(color.to_string());
    }

    fn set_cloud_layer(&mut self, opacity: f32, blur: f32) {
        self.cloud_opacity = opacity.to_string();
        self.cloud_filter = blur_filter_css(blur);
    }

    fn set_haze(&mut self, color: Rgb, opacity: f32) {
        if opacity > 0.0 {
            self.haze_background = Some(haze_css(color));
        }
        self.haze_opacity = opacity.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_surface_values() {
        let mut s = CssSurface::default();
        s.set_background(&[GradientStop::hex(0x102030, 0.0), GradientStop::hex(0x405060, 100.0)], Rgb::hex(0x102030));
        s.set_cloud_layer(0.5, 7.2);
        s.set_haze(Rgb::new(200, 200, 210), 0.3);
        s.set_theme_color(Rgb::hex(0xabcdef));

        assert!(s.background_image.starts_with("linear-gradient("), "{}", s.background_image);
        assert_eq!(s.background_color, "#102030");
        assert_eq!(s.cloud_opacity, "0.5");
        assert_eq!(s.cloud_filter, "blur(7.2px)");
        assert_eq!(s.haze_opacity, "0.3");
        assert!(s.haze_background.is_some());
        assert_eq!(s.theme_color.as_deref(), Some("#abcdef"));
    }

    #[test]
    fn test_zero_blur_is_none() {
        assert_eq!(blur_filter_css(0.0), "none");
        let mut s = CssSurface::default();
        s.set_cloud_layer(0.0, 0.0);
        assert_eq!(s.cloud_opacity, "0");
        assert_eq!(s.cloud_filter, "none");
    }
}
