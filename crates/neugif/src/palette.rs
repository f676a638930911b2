use crate::PALETTE_SIZE;

/// A 256-entry RGB color table, laid out exactly as GIF stores it.
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [u8; PALETTE_SIZE * 3],
}

impl Palette {
    /// Size of the table in bytes (256 * 3).
    pub const BYTE_LEN: usize = PALETTE_SIZE * 3;

    pub fn from_bytes(colors: [u8; PALETTE_SIZE * 3]) -> Self {
        Self { colors }
    }

    /// Raw `R G B R G B ...` bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.colors
    }

    /// Color at palette entry `index`.
    #[inline]
    pub fn color(&self, index: u8) -> [u8; 3] {
        let i = index as usize * 3;
        [self.colors[i], self.colors[i + 1], self.colors[i + 2]]
    }

    pub fn iter(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.colors.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    /// Entry closest to `rgb` by squared euclidean distance.
    ///
    /// When `used` is given, only entries flagged there are candidates; if no
    /// entry qualifies, index 0 is returned.
    pub fn closest(&self, rgb: [u8; 3], used: Option<&[bool; PALETTE_SIZE]>) -> u8 {
        let mut best = 0u8;
        let mut best_dist = u32::MAX;

        for (i, c) in self.iter().enumerate() {
            if used.is_some_and(|u| !u[i]) {
                continue;
            }
            let dr = c[0].abs_diff(rgb[0]) as u32;
            let dg = c[1].abs_diff(rgb[1]) as u32;
            let db = c[2].abs_diff(rgb[2]) as u32;
            let d = dr * dr + dg * dg + db * db;
            if d < best_dist {
                best_dist = d;
                best = i as u8;
            }
        }

        best
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
