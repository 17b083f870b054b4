// Gamma-correct "source over" compositing for 0xAARRGGBB pixels.
// Anti-aliased stroke edges and layer flattening both go through here, so
// edges mix in linear light and never show dark halos.

pub struct GammaLut {
    // sRGB(0..255) -> linear (0..1) as f32
    srgb_to_linear: [f32; 256],
    // linear(0..1) -> sRGB(0..255) via 4096-step quantization
    // (index = (linear * 4095).round())
    linear_to_srgb: [u8; 4096],
}

impl GammaLut {
    /// Build both tables once at startup.
    pub fn new() -> Self {
        let mut s2l = [0.0f32; 256];
        for (v, slot) in s2l.iter_mut().enumerate() {
            let c = v as f32 / 255.0;
            *slot = if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
        }

        let mut l2s = [0u8; 4096];
        for (i, slot) in l2s.iter_mut().enumerate() {
            let l = (i as f32) / 4095.0;
            let s = if l <= 0.003_130_8 { 12.92 * l } else { 1.055 * l.powf(1.0 / 2.4) - 0.055 };
            *slot = (s * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self { srgb_to_linear: s2l, linear_to_srgb: l2s }
    }

    #[inline]
    pub fn srgb_u8_to_linear(&self, v: u8) -> f32 {
        self.srgb_to_linear[v as usize]
    }

    #[inline]
    pub fn linear_to_srgb_u8(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * 4095.0).round() as usize;
        self.linear_to_srgb[idx]
    }

    /// Composite `src` over `dst`. Both are straight-alpha 0xAARRGGBB.
    ///
    /// Fully transparent and fully opaque sources are exact: the result is
    /// `dst` or `src` bit for bit.
    pub fn over(&self, dst: u32, src: u32) -> u32 {
        let sa8 = (src >> 24) as u8;
        if sa8 == 0 {
            return dst;
        }
        if sa8 == 0xFF {
            return src;
        }
        let da8 = (dst >> 24) as u8;
        if da8 == 0 {
            return src;
        }

        let sa = sa8 as f32 / 255.0;
        let da = da8 as f32 / 255.0;
        let dst_weight = da * (1.0 - sa);
        let out_a = sa + dst_weight;

        let mix = |shift: u32| -> u32 {
            let s = self.srgb_u8_to_linear((src >> shift) as u8);
            let d = self.srgb_u8_to_linear((dst >> shift) as u8);
            let lin = (s * sa + d * dst_weight) / out_a;
            self.linear_to_srgb_u8(lin) as u32
        };

        let a = (out_a * 255.0).round().clamp(0.0, 255.0) as u32;
        (a << 24) | (mix(16) << 16) | (mix(8) << 8) | mix(0)
    }

    /// Composite `color` scaled by a coverage in [0,1] over `dst`.
    #[inline]
    pub fn over_with_coverage(&self, dst: u32, color: u32, coverage: f32) -> u32 {
        if coverage <= 0.0 {
            return dst;
        }
        if coverage >= 1.0 {
            return self.over(dst, color);
        }
        let a = ((color >> 24) as f32 * coverage).round() as u32;
        self.over(dst, (a << 24) | (color & 0x00FF_FFFF))
    }
}

impl Default for GammaLut {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::GammaLut;

    #[test]
    fn transparent_source_keeps_destination() {
        let lut = GammaLut::new();
        assert_eq!(lut.over(0xFF12_3456, 0x00FF_FFFF), 0xFF12_3456);
        assert_eq!(lut.over(0x0000_0000, 0x0000_0000), 0);
    }

    #[test]
    fn opaque_source_replaces_destination() {
        let lut = GammaLut::new();
        assert_eq!(lut.over(0xFF12_3456, 0xFFAB_CDEF), 0xFFAB_CDEF);
    }

    #[test]
    fn half_coverage_mixes_in_linear_light() {
        let lut = GammaLut::new();
        let out = lut.over_with_coverage(0xFF00_0000, 0xFFFF_FFFF, 0.5);
        assert_eq!(out >> 24, 0xFF);
        // Linear 0.5 is ~188 in sRGB, well above the naive 128.
        let r = (out >> 16) & 0xFF;
        assert!((180..=195).contains(&r), "r = {r}");
    }

    #[test]
    fn partial_over_transparent_keeps_color() {
        let lut = GammaLut::new();
        let out = lut.over_with_coverage(0, 0xFFFF_0000, 0.5);
        assert_eq!(out & 0x00FF_FFFF, 0x00FF_0000);
        assert_eq!(out >> 24, 128);
    }
}
