use std::f64::consts::PI;

/// Response shape of a single second-order section.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BiquadKind {
    HighPass,
    LowPass,
    /// Bell boost or cut, gain in dB.
    Peaking { gain_db: f64 },
}

/// Fixed parameters for one stage of a cascade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BiquadSpec {
    pub kind: BiquadKind,
    pub frequency: f64,
    pub q: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

/// Second-order IIR section in transposed direct form II.
///
/// The two delay elements are the only state and persist across calls, so a
/// stream can be fed in arbitrarily sized chunks with identical output.
#[derive(Clone, Debug)]
pub struct Biquad {
    coefficients: Coefficients,
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(spec: BiquadSpec, sample_rate: u32) -> Self {
        Self {
            coefficients: design(spec, sample_rate),
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coefficients;
        let x = input as f64;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y as f32
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Current delay-line contents, mostly useful for asserting continuity.
    pub fn state(&self) -> (f64, f64) {
        (self.z1, self.z2)
    }

    /// Magnitude response in dB at `frequency`.
    pub fn response_db(&self, frequency: f64, sample_rate: u32) -> f64 {
        let c = &self.coefficients;
        let w = 2.0 * PI * frequency / sample_rate.max(1) as f64;
        let (sin1, cos1) = w.sin_cos();
        let (sin2, cos2) = (2.0 * w).sin_cos();
        let num_re = c.b0 + c.b1 * cos1 + c.b2 * cos2;
        let num_im = -(c.b1 * sin1 + c.b2 * sin2);
        let den_re = 1.0 + c.a1 * cos1 + c.a2 * cos2;
        let den_im = -(c.a1 * sin1 + c.a2 * sin2);
        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        20.0 * (num / den.max(f64::MIN_POSITIVE)).log10()
    }
}

fn design(spec: BiquadSpec, sample_rate: u32) -> Coefficients {
    let fs = sample_rate.max(1) as f64;
    // Keep the corner strictly inside (0, nyquist) so low sample rates stay stable.
    let frequency = spec.frequency.clamp(1.0, fs * 0.499);
    let w0 = 2.0 * PI * frequency / fs;
    let (sin_w0, cos_w0) = w0.sin_cos();
    let alpha = sin_w0 / (2.0 * spec.q.max(1e-6));

    let (b0, b1, b2, a0, a1, a2) = match spec.kind {
        BiquadKind::HighPass => (
            (1.0 + cos_w0) / 2.0,
            -(1.0 + cos_w0),
            (1.0 + cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        ),
        BiquadKind::LowPass => (
            (1.0 - cos_w0) / 2.0,
            1.0 - cos_w0,
            (1.0 - cos_w0) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w0,
            1.0 - alpha,
        ),
        BiquadKind::Peaking { gain_db } => {
            let a = 10f64.powf(gain_db / 40.0);
            (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            )
        }
    };

    Coefficients {
        b0: b0 / a0,
        b1: b1 / a0,
        b2: b2 / a0,
        a1: a1 / a0,
        a2: a2 / a0,
    }
}
