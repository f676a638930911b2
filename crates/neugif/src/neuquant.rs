//! NeuQuant color quantization.
//!
//! A Kohonen self-organizing map of 256 neurons is trained on a sample of
//! the frame's colors. Each training step picks a winner with a
//! frequency-biased competition (so rarely winning neurons stay in play),
//! pulls it toward the sample and drags its neighbours along with a
//! radius-weighted share of the move. Learning rate and radius decay
//! geometrically over 100 cycles.
//!
//! All arithmetic is fixed-point `i32` with truncating division, so a given
//! input and sample factor always yields the same palette.

use tracing::trace;

use crate::{palette::Palette, GifError, Result, PALETTE_SIZE};

const NETSIZE: usize = PALETTE_SIZE;
const MAX_NET_POS: i32 = NETSIZE as i32 - 1;

// Sampling strides; the picture length is tested against each in turn.
const PRIME1: usize = 499;
const PRIME2: usize = 491;
const PRIME3: usize = 487;
const PRIME4: usize = 503;
const MIN_PICTURE_BYTES: usize = 3 * PRIME4;

const N_CYCLES: usize = 100;

// Network values are colors scaled up by this many bits during training.
const NET_BIAS_SHIFT: i32 = 4;

// Frequency and bias bookkeeping.
const INT_BIAS_SHIFT: i32 = 16;
const INT_BIAS: i32 = 1 << INT_BIAS_SHIFT;
const GAMMA_SHIFT: i32 = 10;
const BETA_SHIFT: i32 = 10;
const BETA: i32 = INT_BIAS >> BETA_SHIFT;
const BETA_GAMMA: i32 = INT_BIAS << (GAMMA_SHIFT - BETA_SHIFT);

// Neighbourhood radius.
const INIT_RAD: usize = NETSIZE >> 3;
const RADIUS_BIAS_SHIFT: i32 = 6;
const RADIUS_BIAS: i32 = 1 << RADIUS_BIAS_SHIFT;
const INIT_RADIUS: i32 = INIT_RAD as i32 * RADIUS_BIAS;
const RADIUS_DEC: i32 = 30;

// Learning rate.
const ALPHA_BIAS_SHIFT: i32 = 10;
const INIT_ALPHA: i32 = 1 << ALPHA_BIAS_SHIFT;

const RAD_BIAS_SHIFT: i32 = 8;
const RAD_BIAS: i32 = 1 << RAD_BIAS_SHIFT;
const ALPHA_RAD_B_SHIFT: i32 = ALPHA_BIAS_SHIFT + RAD_BIAS_SHIFT;
const ALPHA_RAD_BIAS: i32 = 1 << ALPHA_RAD_B_SHIFT;

/// A trained NeuQuant network.
///
/// Construction runs the whole pipeline (train, unbias, sort, build the
/// palette); afterwards the network is read-only and answers
/// [`nearest`](Self::nearest) lookups.
#[derive(Clone)]
pub struct NeuQuant {
    /// `[r, g, b, original index]` per neuron.
    network: [[i32; 4]; NETSIZE],
    /// First neuron position for each green value, valid once sorted.
    netindex: [i32; 256],
    bias: [i32; NETSIZE],
    freq: [i32; NETSIZE],
    radpower: [i32; INIT_RAD],
    sample_factor: i32,
    palette: Palette,
}

impl NeuQuant {
    /// Train a network on `rgb` (dense `R G B` triples).
    ///
    /// `sample_factor` trades speed for fidelity: 1 trains on every pixel,
    /// 10 on a tenth of them. Pictures smaller than 1509 bytes are always
    /// trained with factor 1.
    ///
    /// # Errors
    ///
    /// [`GifError::QuantizerInit`] if `rgb` is empty, is not a whole number
    /// of triples, or `sample_factor` is zero.
    pub fn new(rgb: &[u8], sample_factor: u32) -> Result<Self> {
        if rgb.is_empty() {
            return Err(GifError::QuantizerInit("empty training buffer".to_string()));
        }
        if rgb.len() % 3 != 0 {
            return Err(GifError::QuantizerInit(format!(
                "training buffer length {} is not a multiple of 3",
                rgb.len()
            )));
        }
        let sample_factor = i32::try_from(sample_factor)
            .ok()
            .filter(|&s| s >= 1)
            .ok_or_else(|| {
                GifError::QuantizerInit(format!("invalid sample factor {sample_factor}"))
            })?;

        let mut network = [[0i32; 4]; NETSIZE];
        for (i, n) in network.iter_mut().enumerate() {
            let v = ((i as i32) << (NET_BIAS_SHIFT + 8)) / NETSIZE as i32;
            *n = [v, v, v, 0];
        }

        let mut nq = Self {
            network,
            netindex: [0; 256],
            bias: [0; NETSIZE],
            freq: [INT_BIAS / NETSIZE as i32; NETSIZE],
            radpower: [0; INIT_RAD],
            sample_factor,
            palette: Palette::from_bytes([0; Palette::BYTE_LEN]),
        };

        nq.learn(rgb);
        nq.unbias();
        nq.build_index();
        nq.build_palette();
        Ok(nq)
    }

    /// The learned 256-color palette, in neuron order.
    #[inline]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Index of the palette entry nearest to `(r, g, b)` (L1 distance).
    ///
    /// Neurons are sorted by green, so the scan starts at the green index
    /// and walks outward in both directions, giving up on a direction once
    /// the green distance alone reaches the best match.
    pub fn nearest(&self, r: u8, g: u8, b: u8) -> u8 {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        let mut bestd = 1000;
        let mut best = 0;

        let mut i = self.netindex[g as usize];
        let mut j = i - 1;

        while i < NETSIZE as i32 || j >= 0 {
            if i < NETSIZE as i32 {
                let p = &self.network[i as usize];
                let mut dist = p[1] - g;
                if dist >= bestd {
                    i = NETSIZE as i32;
                } else {
                    i += 1;
                    dist = dist.abs() + (p[0] - r).abs();
                    if dist < bestd {
                        dist += (p[2] - b).abs();
                        if dist < bestd {
                            bestd = dist;
                            best = p[3];
                        }
                    }
                }
            }

            if j >= 0 {
                let p = &self.network[j as usize];
                let mut dist = g - p[1];
                if dist >= bestd {
                    j = -1;
                } else {
                    j -= 1;
                    dist = dist.abs() + (p[0] - r).abs();
                    if dist < bestd {
                        dist += (p[2] - b).abs();
                        if dist < bestd {
                            bestd = dist;
                            best = p[3];
                        }
                    }
                }
            }
        }

        best as u8
    }

    fn learn(&mut self, pixels: &[u8]) {
        let length = pixels.len();
        let sample_factor = if length < MIN_PICTURE_BYTES {
            1
        } else {
            self.sample_factor
        };
        let alphadec = 30 + (sample_factor - 1) / 3;
        let sample_pixels = length / (3 * sample_factor as usize);
        let delta = (sample_pixels / N_CYCLES).max(1);
        let step = sampling_step(length);

        let mut alpha = INIT_ALPHA;
        let mut radius = INIT_RADIUS;
        let mut rad = radius_to_rad(radius);
        self.update_radpower(rad, alpha);

        trace!(length, sample_factor, sample_pixels, step, "training network");

        let mut pix = 0;
        for i in 1..=sample_pixels {
            let r = (pixels[pix] as i32) << NET_BIAS_SHIFT;
            let g = (pixels[pix + 1] as i32) << NET_BIAS_SHIFT;
            let b = (pixels[pix + 2] as i32) << NET_BIAS_SHIFT;

            let winner = self.contest(r, g, b);
            self.alter_single(alpha, winner, r, g, b);
            if rad != 0 {
                self.alter_neighbours(rad, winner, r, g, b);
            }

            pix += step;
            if pix >= length {
                pix -= length;
            }

            if i % delta == 0 {
                alpha -= alpha / alphadec;
                radius -= radius / RADIUS_DEC;
                rad = radius_to_rad(radius);
                self.update_radpower(rad, alpha);
            }
        }
    }

    fn update_radpower(&mut self, rad: i32, alpha: i32) {
        let rad2 = rad * rad;
        for (i, p) in self.radpower.iter_mut().take(rad as usize).enumerate() {
            let i = i as i32;
            *p = alpha * (((rad2 - i * i) * RAD_BIAS) / rad2);
        }
    }

    /// One sweep over the network: returns the frequency-biased winner and
    /// updates every neuron's frequency and bias; the plain winner is
    /// rewarded with frequency and penalised in bias.
    fn contest(&mut self, r: i32, g: i32, b: i32) -> usize {
        let mut bestd = i32::MAX;
        let mut bestbiasd = bestd;
        let mut bestpos = 0;
        let mut bestbiaspos = 0;

        for i in 0..NETSIZE {
            let n = &self.network[i];
            let dist = (n[0] - r).abs() + (n[1] - g).abs() + (n[2] - b).abs();
            if dist < bestd {
                bestd = dist;
                bestpos = i;
            }

            let biasdist = dist - (self.bias[i] >> (INT_BIAS_SHIFT - NET_BIAS_SHIFT));
            if biasdist < bestbiasd {
                bestbiasd = biasdist;
                bestbiaspos = i;
            }

            let betafreq = self.freq[i] >> BETA_SHIFT;
            self.freq[i] -= betafreq;
            self.bias[i] += betafreq << GAMMA_SHIFT;
        }

        self.freq[bestpos] += BETA;
        self.bias[bestpos] -= BETA_GAMMA;
        bestbiaspos
    }

    fn alter_single(&mut self, alpha: i32, i: usize, r: i32, g: i32, b: i32) {
        let n = &mut self.network[i];
        n[0] -= (alpha * (n[0] - r)) / INIT_ALPHA;
        n[1] -= (alpha * (n[1] - g)) / INIT_ALPHA;
        n[2] -= (alpha * (n[2] - b)) / INIT_ALPHA;
    }

    fn alter_neighbours(&mut self, rad: i32, i: usize, r: i32, g: i32, b: i32) {
        let i = i as i32;
        let lo = (i - rad).max(-1);
        let hi = (i + rad).min(NETSIZE as i32);

        let mut j = i + 1;
        let mut k = i - 1;
        let mut m = 1;

        while j < hi || k > lo {
            let a = self.radpower[m];
            m += 1;
            if j < hi {
                self.nudge(j, a, r, g, b);
                j += 1;
            }
            if k > lo {
                self.nudge(k, a, r, g, b);
                k -= 1;
            }
        }
    }

    fn nudge(&mut self, pos: i32, a: i32, r: i32, g: i32, b: i32) {
        // Positions outside the network are skipped, not clamped.
        let Some(n) = usize::try_from(pos)
            .ok()
            .and_then(|pos| self.network.get_mut(pos))
        else {
            return;
        };
        n[0] -= (a * (n[0] - r)) / ALPHA_RAD_BIAS;
        n[1] -= (a * (n[1] - g)) / ALPHA_RAD_BIAS;
        n[2] -= (a * (n[2] - b)) / ALPHA_RAD_BIAS;
    }

    fn unbias(&mut self) {
        for (i, n) in self.network.iter_mut().enumerate() {
            n[0] = (n[0] >> NET_BIAS_SHIFT).clamp(0, 255);
            n[1] = (n[1] >> NET_BIAS_SHIFT).clamp(0, 255);
            n[2] = (n[2] >> NET_BIAS_SHIFT).clamp(0, 255);
            n[3] = i as i32;
        }
    }

    /// Selection-sort the network by green and record, for every green
    /// value, where the search should start.
    fn build_index(&mut self) {
        let mut previouscol = 0;
        let mut startpos = 0;

        for i in 0..NETSIZE {
            let mut smallpos = i;
            let mut smallval = self.network[i][1];
            for j in (i + 1)..NETSIZE {
                if self.network[j][1] < smallval {
                    smallpos = j;
                    smallval = self.network[j][1];
                }
            }
            if i != smallpos {
                self.network.swap(i, smallpos);
            }

            if smallval != previouscol {
                self.netindex[previouscol as usize] = (startpos + i as i32) >> 1;
                for j in (previouscol + 1)..smallval {
                    self.netindex[j as usize] = i as i32;
                }
                previouscol = smallval;
                startpos = i as i32;
            }
        }

        self.netindex[previouscol as usize] = (startpos + MAX_NET_POS) >> 1;
        for j in (previouscol as usize + 1)..256 {
            self.netindex[j] = MAX_NET_POS;
        }
    }

    fn build_palette(&mut self) {
        let mut colors = [0u8; Palette::BYTE_LEN];
        for n in &self.network {
            let at = n[3] as usize * 3;
            colors[at] = n[0] as u8;
            colors[at + 1] = n[1] as u8;
            colors[at + 2] = n[2] as u8;
        }
        self.palette = Palette::from_bytes(colors);
    }
}

impl std::fmt::Debug for NeuQuant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeuQuant")
            .field("sample_factor", &self.sample_factor)
            .field("palette", &self.palette)
            .finish_non_exhaustive()
    }
}

#[inline]
fn radius_to_rad(radius: i32) -> i32 {
    let rad = radius >> RADIUS_BIAS_SHIFT;
    if rad <= 1 {
        0
    } else {
        rad
    }
}

/// Byte stride between training samples for a picture of `length` bytes.
///
/// Uses the first prime that does not divide the length so the walk visits
/// pixels in a scattered but reproducible order.
fn sampling_step(length: usize) -> usize {
    if length < MIN_PICTURE_BYTES {
        return 3;
    }
    let prime = [PRIME1, PRIME2, PRIME3]
        .into_iter()
        .find(|p| length % p != 0)
        .unwrap_or(PRIME4);
    3 * prime
}
