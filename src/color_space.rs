use palette::white_point::D65;
use palette::{Lab, Srgb};

/// Lab color carried through the whole pipeline.
pub type LabColor = Lab<D65, f64>;

// ------------------------------------------------------------
// CIE constants (D65)
// ------------------------------------------------------------

const EPSILON: f64 = 0.008856;
const KAPPA: f64 = 903.3;

const REF_X: f64 = 0.95047;
const REF_Y: f64 = 1.0;
const REF_Z: f64 = 1.08883;

const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

const XYZ_TO_RGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

#[inline]
fn mul(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

// ------------------------------------------------------------
// sRGB -> Lab
// ------------------------------------------------------------

/// Decode one gamma-encoded 8-bit channel to linear light in `0..=1`.
#[inline]
pub fn srgb_to_linear(channel: u8) -> f64 {
    let v = channel as f64 / 255.0;
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

pub fn rgb_to_xyz(rgb: Srgb<u8>) -> [f64; 3] {
    let linear = [
        srgb_to_linear(rgb.red),
        srgb_to_linear(rgb.green),
        srgb_to_linear(rgb.blue),
    ];
    mul(&RGB_TO_XYZ, linear)
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > EPSILON {
        t.cbrt()
    } else {
        (KAPPA * t + 16.0) / 116.0
    }
}

pub fn xyz_to_lab(xyz: [f64; 3]) -> LabColor {
    let fx = lab_f(xyz[0] / REF_X);
    let fy = lab_f(xyz[1] / REF_Y);
    let fz = lab_f(xyz[2] / REF_Z);

    Lab::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

pub fn rgb_to_lab(rgb: Srgb<u8>) -> LabColor {
    xyz_to_lab(rgb_to_xyz(rgb))
}

// ------------------------------------------------------------
// Lab -> sRGB
// ------------------------------------------------------------

pub fn lab_to_xyz(lab: LabColor) -> [f64; 3] {
    let fy = (lab.l + 16.0) / 116.0;
    let fx = lab.a / 500.0 + fy;
    let fz = fy - lab.b / 200.0;

    let fx3 = fx * fx * fx;
    let fz3 = fz * fz * fz;

    let xr = if fx3 > EPSILON {
        fx3
    } else {
        (116.0 * fx - 16.0) / KAPPA
    };
    let yr = if lab.l > KAPPA * EPSILON {
        fy * fy * fy
    } else {
        lab.l / KAPPA
    };
    let zr = if fz3 > EPSILON {
        fz3
    } else {
        (116.0 * fz - 16.0) / KAPPA
    };

    [xr * REF_X, yr * REF_Y, zr * REF_Z]
}

/// Encode linear light back to a rounded, clamped 8-bit channel.
#[inline]
pub fn linear_to_srgb(linear: f64) -> u8 {
    let v = if linear <= 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

pub fn xyz_to_rgb(xyz: [f64; 3]) -> Srgb<u8> {
    let [r, g, b] = mul(&XYZ_TO_RGB, xyz);
    Srgb::new(linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b))
}

pub fn lab_to_rgb(lab: LabColor) -> Srgb<u8> {
    xyz_to_rgb(lab_to_xyz(lab))
}

// ------------------------------------------------------------
// Formatting and metrics
// ------------------------------------------------------------

/// `#RRGGBB`, uppercase and zero padded.
pub fn rgb_to_hex(rgb: Srgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb.red, rgb.green, rgb.blue)
}

pub fn lab_to_hex(lab: LabColor) -> String {
    rgb_to_hex(lab_to_rgb(lab))
}

/// CIE76 color difference: Euclidean distance in Lab.
#[inline]
pub fn delta_e(x: &LabColor, y: &LabColor) -> f64 {
    let dl = x.l - y.l;
    let da = x.a - y.a;
    let db = x.b - y.b;
    (dl * dl + da * da + db * db).sqrt()
}

#[inline]
pub fn chroma(lab: &LabColor) -> f64 {
    (lab.a * lab.a + lab.b * lab.b).sqrt()
}

pub(crate) fn is_finite_lab(lab: &LabColor) -> bool {
    lab.l.is_finite() && lab.a.is_finite() && lab.b.is_finite()
}
