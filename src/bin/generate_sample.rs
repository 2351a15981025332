//! Write a synthetic test-lab export and a reconstructed FRF file for
//! trying out the viewer: `sample_testlab.unv` and `sample_reconstructed.unv`.

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use ndarray::Array2;
use num_complex::Complex64;

use emav::data::unv::{
    write_blocks, AxisSpec, FunctionHeader, OrdinateDataType, ResponseFunction, UnvBlock,
};

/// (natural frequency Hz, damping ratio, modal constant)
type Mode = (f64, f64, f64);

const MODES: &[Mode] = &[(42.0, 0.02, 1.0e4), (118.0, 0.015, 2.5e4), (265.0, 0.01, 6.0e4)];

/// Receptance of a sum of single degree of freedom modes at `freq` Hz.
fn modal_frf(freq: f64, modes: &[Mode], scale: f64) -> Complex64 {
    let w = 2.0 * std::f64::consts::PI * freq;
    modes
        .iter()
        .map(|&(fn_hz, zeta, a)| {
            let wn = 2.0 * std::f64::consts::PI * fn_hz;
            Complex64::new(a * scale, 0.0) / Complex64::new(wn * wn - w * w, 2.0 * zeta * wn * w)
        })
        .sum()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn frf_block(node: i64, dir: i64, freqs: &[f64], rng: &mut SimpleRng) -> UnvBlock {
    let mut header = FunctionHeader::response(node, dir, 1, 3);
    header.id_lines[0] = format!("FRF {node}:+{dir} / 1:+3");
    header.func_id = node;
    header.data_type = OrdinateDataType::ComplexSingle;
    header.num_values_per_point = 2;
    header.abscissa_min = freqs[0];
    header.abscissa_inc = freqs[1] - freqs[0];
    header.ordinate_axis = AxisSpec {
        spec_data_type: 12,
        ..AxisSpec::labelled("Accel/Force", "g/N")
    };
    header.z_axis.spec_data_type = 1;

    let scale = 1.0 / node as f64;
    let mut data = Array2::<f64>::zeros((freqs.len(), 2));
    for (i, &f) in freqs.iter().enumerate() {
        let h = modal_frf(f, MODES, scale);
        let noise = 0.01 * h.norm();
        data[[i, 0]] = h.re + rng.gauss(0.0, noise);
        data[[i, 1]] = h.im + rng.gauss(0.0, noise);
    }
    UnvBlock::Function(ResponseFunction {
        header,
        x: freqs.to_vec(),
        data,
    })
}

fn coherence_block(freqs: &[f64], rng: &mut SimpleRng) -> UnvBlock {
    let mut header = FunctionHeader::response(1, 3, 1, 3);
    header.id_lines[0] = "Coherence 1:+3 / 1:+3".to_string();
    header.func_type = 9;
    header.data_type = OrdinateDataType::RealSingle;
    header.abscissa_min = freqs[0];
    header.abscissa_inc = freqs[1] - freqs[0];
    header.ordinate_axis = AxisSpec::labelled("Coherence", "NONE");

    let mut data = Array2::<f64>::zeros((freqs.len(), 1));
    for value in data.iter_mut() {
        *value = (0.97 + rng.gauss(0.0, 0.01)).clamp(0.0, 1.0);
    }
    UnvBlock::Function(ResponseFunction {
        header,
        x: freqs.to_vec(),
        data,
    })
}

fn units_block() -> UnvBlock {
    UnvBlock::Other {
        type_tag: 164,
        lines: vec![
            "         1  SI - mks (Newton)        2".to_string(),
            "  1.00000000000000000E+00  1.00000000000000000E+00  1.00000000000000000E+00".to_string(),
            "  1.00000000000000000E+00  1.00000000000000000E+00  2.73150000000000000E+02".to_string(),
        ],
    }
}

fn reconstructed_blocks(freqs: &[f64]) -> Vec<UnvBlock> {
    let mut header = FunctionHeader::response(1, 3, 1, 3);
    header.id_lines[0] = "Reconstructed FRF 1:+3 / 1:+3".to_string();
    header.data_type = OrdinateDataType::RealDouble;
    header.num_values_per_point = 2;
    header.abscissa_min = freqs[0];
    header.abscissa_inc = freqs[1] - freqs[0];
    header.ordinate_axis = AxisSpec::labelled("AMPLITUDE", "g/N");

    let mut data = Array2::<f64>::zeros((freqs.len(), 2));
    for (i, &f) in freqs.iter().enumerate() {
        data[[i, 0]] = modal_frf(f, MODES, 1.0).norm();
    }

    vec![
        UnvBlock::Other {
            type_tag: 151,
            lines: vec![
                "sample_model".to_string(),
                "NONE".to_string(),
                "generate_sample".to_string(),
                "01-JAN-26    00:00:00".to_string(),
            ],
        },
        UnvBlock::Function(ResponseFunction {
            header,
            x: freqs.to_vec(),
            data,
        }),
    ]
}

fn write_file(path: &str, blocks: &[UnvBlock]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = BufWriter::new(file);
    write_blocks(&mut writer, blocks).with_context(|| format!("writing {path}"))?;
    writer.flush().with_context(|| format!("writing {path}"))?;
    println!("Wrote {} datasets to {path}", blocks.len());
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // 1 Hz .. 400 Hz, step 0.5 Hz
    let freqs: Vec<f64> = (0..800).map(|i| 1.0 + i as f64 * 0.5).collect();

    let mut testlab = vec![units_block()];
    for node in 1..=4 {
        testlab.push(frf_block(node, 3, &freqs, &mut rng));
    }
    testlab.push(coherence_block(&freqs, &mut rng));

    write_file("sample_testlab.unv", &testlab)?;
    write_file("sample_reconstructed.unv", &reconstructed_blocks(&freqs))?;
    Ok(())
}
