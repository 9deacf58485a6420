use anyhow::{Context, Result};

use happiness_explorer::{Column, Indicator};

const REGIONS: [(&str, f64); 10] = [
    ("Western Europe", 6.9),
    ("North America and ANZ", 6.9),
    ("Central and Eastern Europe", 6.2),
    ("Latin America and Caribbean", 6.0),
    ("East Asia", 5.9),
    ("Commonwealth of Independent States", 5.6),
    ("Southeast Asia", 5.4),
    ("Middle East and North Africa", 5.2),
    ("Sub-Saharan Africa", 4.4),
    ("South Asia", 4.1),
];

const COUNTRIES_PER_REGION: usize = 14;

/// splitmix64 stream with Box-Muller normals; the second normal of each
/// pair is kept for the next call.
struct SplitMix {
    state: u64,
    spare: Option<f64>,
}

impl SplitMix {
    fn seeded(seed: u64) -> Self {
        SplitMix { state: seed, spare: None }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)` from the top 53 bits.
    fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let z = match self.spare.take() {
            Some(z) => z,
            None => {
                // 1 - u is in (0, 1], so ln never sees zero
                let radius = (-2.0 * (1.0 - self.uniform()).ln()).sqrt();
                let angle = std::f64::consts::TAU * self.uniform();
                self.spare = Some(radius * angle.sin());
                radius * angle.cos()
            }
        };
        mean + std_dev * z
    }
}

/// Indicator values loosely tied to the happiness score, in report units.
fn indicators(score: f64, rng: &mut SplitMix) -> [f64; 6] {
    let t = ((score - 2.0) / 6.0).clamp(0.0, 1.0);
    [
        7.0 + 4.5 * t + rng.normal(0.0, 0.35),
        (0.45 + 0.5 * t + rng.normal(0.0, 0.05)).clamp(0.0, 1.0),
        50.0 + 22.0 * t + rng.normal(0.0, 2.5),
        (0.55 + 0.35 * t + rng.normal(0.0, 0.06)).clamp(0.0, 1.0),
        rng.normal(0.0, 0.15),
        (0.9 - 0.45 * t + rng.normal(0.0, 0.08)).clamp(0.0, 1.0),
    ]
}

fn main() -> Result<()> {
    let mut rng = SplitMix::seeded(2023);
    let output_path = "sample_whr.csv";
    let mut writer = csv::Writer::from_path(output_path).context("creating output file")?;

    writer.write_record(Column::ALL.iter().map(|c| c.name()))?;

    let mut rows = 0usize;
    for (r, (region, mean_score)) in REGIONS.into_iter().enumerate() {
        let prefix: String = region.split_whitespace().filter_map(|w| w.chars().next()).collect();
        for i in 0..COUNTRIES_PER_REGION {
            let score = rng.normal(mean_score, 0.6).clamp(1.5, 8.0);
            let rest = indicators(score, &mut rng);

            let country = format!("{prefix}-{:03}", r * COUNTRIES_PER_REGION + i + 1);
            let mut record = vec![country, region.to_string()];
            record.push(format!("{score:.3}"));
            for (ind, value) in Indicator::ALL[1..].iter().zip(rest) {
                // Roughly 3% of cells are left blank, like gaps in the published data.
                if rng.uniform() < 0.03 && *ind != Indicator::GdpPerCapita {
                    record.push(String::new());
                } else {
                    record.push(format!("{value:.3}"));
                }
            }
            writer.write_record(&record)?;
            rows += 1;
        }
    }
    writer.flush().context("flushing output")?;

    println!("Wrote {rows} countries across {} regions to {output_path}", REGIONS.len());
    Ok(())
}
