//! WCAG contrast math.
//!
//! Pure functions over [`Rgb`]: relative luminance, contrast ratio, the AA
//! legibility check, and the YIQ brightness heuristic used to pick a
//! provisional text color before the precise ratio check.

use super::rgb::Rgb;

/// WCAG AA threshold for normal-size text.
pub const MIN_CONTRAST: f64 = 4.5;

/// YIQ brightness at or above which a background counts as "bright".
pub const YIQ_BRIGHT_THRESHOLD: f64 = 128.0;

/// Shades tried when neither pure white nor pure black clears [`MIN_CONTRAST`].
const WIDENED_TEXT_CANDIDATES: [Rgb; 6] = [
    Rgb::new(248, 250, 252),
    Rgb::new(241, 245, 249),
    Rgb::new(226, 232, 240),
    Rgb::new(15, 23, 42),
    Rgb::new(30, 41, 59),
    Rgb::new(17, 24, 39),
];

fn linearize(channel: u8) -> f64 {
    let v = f64::from(channel) / 255.0;
    if v <= 0.03928 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Relative luminance in `[0, 1]`.
pub fn luminance(c: Rgb) -> f64 {
    0.2126 * linearize(c.r) + 0.7152 * linearize(c.g) + 0.0722 * linearize(c.b)
}

/// WCAG contrast ratio, always `>= 1`. Symmetric in its arguments.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = luminance(a);
    let lb = luminance(b);
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// True when `fg` on `bg` meets WCAG AA for normal text.
pub fn is_legible(fg: Rgb, bg: Rgb) -> bool {
    contrast_ratio(fg, bg) >= MIN_CONTRAST
}

/// YIQ perceived brightness in `[0, 255]`.
pub fn yiq_brightness(c: Rgb) -> f64 {
    (f64::from(c.r) * 299.0 + f64::from(c.g) * 587.0 + f64::from(c.b) * 114.0) / 1000.0
}

pub fn is_bright(c: Rgb) -> bool {
    yiq_brightness(c) >= YIQ_BRIGHT_THRESHOLD
}

/// Pick a legible text color for `background`.
///
/// YIQ proposes black or white; whichever of the two has the higher ratio
/// wins if it clears [`MIN_CONTRAST`]. Otherwise a fixed set of near-white and
/// near-black shades is searched. `None` means the caller must use its
/// fallback-default pair.
pub fn pick_text_color(background: Rgb) -> Option<Rgb> {
    let (provisional, alternate) = if is_bright(background) {
        (Rgb::BLACK, Rgb::WHITE)
    } else {
        (Rgb::WHITE, Rgb::BLACK)
    };

    let best = if contrast_ratio(alternate, background) > contrast_ratio(provisional, background) {
        alternate
    } else {
        provisional
    };
    if is_legible(best, background) {
        return Some(best);
    }

    WIDENED_TEXT_CANDIDATES
        .iter()
        .copied()
        .filter(|c| is_legible(*c, background))
        .max_by(|a, b| contrast_ratio(*a, background).total_cmp(&contrast_ratio(*b, background)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rgb() -> impl Strategy<Value = Rgb> {
        (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| Rgb::new(r, g, b))
    }

    #[test]
    fn black_and_white_is_21() {
        let ratio = contrast_ratio(Rgb::WHITE, Rgb::BLACK);
        assert!((ratio - 21.0).abs() < 1e-9, "got {ratio}");
    }

    #[test]
    fn luminance_bounds() {
        assert_eq!(luminance(Rgb::BLACK), 0.0);
        assert!((luminance(Rgb::WHITE) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn low_channel_uses_linear_segment() {
        // 10/255 = 0.0392 <= 0.03928
        let expected = 0.2126 * (10.0 / 255.0 / 12.92);
        assert!((luminance(Rgb::new(10, 0, 0)) - expected).abs() < 1e-12);
    }

    #[test]
    fn yiq_classification() {
        assert_eq!(yiq_brightness(Rgb::WHITE), 255.0);
        assert_eq!(yiq_brightness(Rgb::BLACK), 0.0);
        assert!(is_bright(Rgb::WHITE));
        assert!(!is_bright(Rgb::BLACK));
        assert!(is_bright(Rgb::new(255, 255, 0)));
        assert!(!is_bright(Rgb::new(0, 0, 255)));
    }

    #[test]
    fn legibility_threshold() {
        assert!(is_legible(Rgb::BLACK, Rgb::WHITE));
        // #777 on white is ~4.48:1, just under AA
        assert!(!is_legible(Rgb::new(0x77, 0x77, 0x77), Rgb::WHITE));
        // #767676 on white is the classic AA-passing gray
        assert!(is_legible(Rgb::new(0x76, 0x76, 0x76), Rgb::WHITE));
    }

    #[test]
    fn pick_text_prefers_dark_on_light() {
        assert_eq!(pick_text_color(Rgb::new(250, 250, 250)), Some(Rgb::BLACK));
        assert_eq!(pick_text_color(Rgb::new(20, 20, 60)), Some(Rgb::WHITE));
    }

    #[test]
    fn pick_text_overrides_misleading_yiq() {
        // Mid orange: YIQ says bright-ish, ratio check decides.
        let bg = Rgb::new(230, 120, 0);
        let text = pick_text_color(bg).unwrap();
        assert!(is_legible(text, bg));
        assert!(contrast_ratio(text, bg) >= contrast_ratio(Rgb::WHITE, bg));
    }

    proptest! {
        #[test]
        fn contrast_is_symmetric(a in rgb(), b in rgb()) {
            let ab = contrast_ratio(a, b);
            let ba = contrast_ratio(b, a);
            prop_assert!((ab - ba).abs() < 1e-12);
            prop_assert!(ab >= 1.0);
        }

        #[test]
        fn contrast_with_self_is_one(a in rgb()) {
            prop_assert!((contrast_ratio(a, a) - 1.0).abs() < 1e-12);
        }

        #[test]
        fn luminance_in_unit_range(a in rgb()) {
            let l = luminance(a);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&l));
        }

        #[test]
        fn picked_text_is_always_legible(bg in rgb()) {
            let text = pick_text_color(bg);
            prop_assert!(text.is_some());
            prop_assert!(contrast_ratio(text.unwrap(), bg) >= MIN_CONTRAST);
        }

        #[test]
        fn near_extremes_are_legible(v in prop_oneof![0u8..=24, 231u8..=255]) {
            let bg = Rgb::new(v, v, v);
            let text = pick_text_color(bg).unwrap();
            prop_assert!(is_legible(text, bg));
        }
    }
}
