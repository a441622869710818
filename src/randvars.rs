use std::fs;
use std::path::Path;
use std::str::FromStr;

use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::Poisson;

use crate::utils::prelude::*;

/// How far the last cumulative probability may be from 1.0
const PROB_TOLERANCE: f64 = 1e-6;

/// Cumulative distribution of message sizes, as rows of `(cumulative probability, size)`.
///
/// Only constructed through validation: rows are non-empty, probabilities are strictly
/// increasing within (0, 1] and end at 1.0, sizes are positive.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeDistribution {
    rows: Vec<(f64, u64)>,
}

impl SizeDistribution {
    pub fn new(rows: impl IntoIterator<Item = (f64, u64)>) -> Result<Self> {
        Self::validated(rows.into_iter().enumerate().map(|(idx, row)| (idx + 1, row)))
    }

    /// Read the text format: one `probability size` pair per line, `#` starts a comment line
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let dist: Self = text.parse()?;
        info!(path = %path.display(), rows = dist.rows.len(), mean = dist.mean(), "loaded size distribution");
        Ok(dist)
    }

    /// `line` is only used for error reporting
    fn validated(rows: impl Iterator<Item = (usize, (f64, u64))>) -> Result<Self> {
        let mut prev = 0.0;
        let mut last_line = 0;
        let mut validated = vec![];
        for (line, (prob, size)) in rows {
            if !(prob > prev && prob <= 1.0 + PROB_TOLERANCE) {
                return Err(Error::distribution(
                    line,
                    format!("cumulative probability {} does not increase from {} within (0, 1]", prob, prev),
                ));
            }
            if size == 0 {
                return Err(Error::distribution(line, "message size must be positive"));
            }
            prev = prob;
            last_line = line;
            validated.push((prob, size));
        }
        if validated.is_empty() {
            return Err(Error::distribution(0, "no rows"));
        }
        if (prev - 1.0).abs() > PROB_TOLERANCE {
            return Err(Error::distribution(
                last_line,
                format!("cumulative probability ends at {} instead of 1.0", prev),
            ));
        }
        Ok(Self { rows: validated })
    }

    pub fn rows(&self) -> &[(f64, u64)] {
        &self.rows
    }

    pub fn sizes(&self) -> impl Iterator<Item = u64> + '_ {
        self.rows.iter().map(|(_, size)| *size)
    }

    /// Expected message size in packets
    pub fn mean(&self) -> f64 {
        self.rows
            .iter()
            .scan(0.0, |prev, &(prob, size)| {
                let weight = prob - *prev;
                *prev = prob;
                Some(size as f64 * weight)
            })
            .sum()
    }
}

impl Distribution<u64> for SizeDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let u: f64 = rng.gen();
        self.rows
            .iter()
            .find(|(prob, _)| *prob > u)
            .map(|(_, size)| *size)
            // only reachable when the last row is a hair below 1.0
            .unwrap_or_else(|| self.rows[self.rows.len() - 1].1)
    }
}

impl FromStr for SizeDistribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rows: Result<Vec<_>> = s
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
            .map(|(line, text)| {
                parse_row(text)
                    .map(|row| (line, row))
                    .map_err(|reason| Error::distribution(line, reason))
            })
            .collect();
        Self::validated(rows?.into_iter())
    }
}

fn parse_row(text: &str) -> std::result::Result<(f64, u64), String> {
    let cols: Vec<_> = text.split_whitespace().collect();
    if cols.len() != 2 {
        return Err(format!("expected `probability size`, found {} columns", cols.len()));
    }
    let prob: f64 = cols[0]
        .parse()
        .map_err(|e| format!("bad probability `{}`: {}", cols[0], e))?;
    // sizes are often written as floats
    let size: f64 = cols[1]
        .parse()
        .map_err(|e| format!("bad size `{}`: {}", cols[1], e))?;
    if !size.is_finite() || size < 0.0 || size.fract() != 0.0 {
        return Err(format!("size `{}` is not a whole number of packets", cols[1]));
    }
    Ok((prob, size as u64))
}

/// Network transit delay of a single packet: `fixed_delay + Poisson(avg_delay)` slots.
///
/// The network has full bisection bandwidth, so latency is the only effect it has.
#[derive(Debug, Clone)]
pub struct DelayModel {
    avg_delay: f64,
    fixed_delay: u64,
    /// `None` when there is no random component
    poisson: Option<Poisson>,
}

impl DelayModel {
    pub fn new(avg_delay: f64, fixed_delay: u64) -> Result<Self> {
        if !avg_delay.is_finite() || avg_delay < 0.0 {
            return Err(Error::parameter(format!(
                "avg_delay must be a finite non-negative number, got {}",
                avg_delay
            )));
        }
        let poisson = if avg_delay > 0.0 {
            Some(Poisson::new(avg_delay).map_err(|e| Error::parameter(format!("avg_delay: {}", e)))?)
        } else {
            None
        };
        Ok(Self {
            avg_delay,
            fixed_delay,
            poisson,
        })
    }

    pub fn avg_delay(&self) -> f64 {
        self.avg_delay
    }

    pub fn fixed_delay(&self) -> u64 {
        self.fixed_delay
    }

    /// Expected delay of a packet in slots
    pub fn mean(&self) -> f64 {
        self.avg_delay + self.fixed_delay as f64
    }
}

impl Distribution<u64> for DelayModel {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let random = self.poisson.as_ref().map(|p| p.sample(rng) as u64).unwrap_or(0);
        self.fixed_delay + random
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand_seeder::{Seeder, SipRng};

    use super::*;

    fn rng() -> SipRng {
        Seeder::from("randvars").make_rng()
    }

    fn invalid_line(res: Result<SizeDistribution>) -> usize {
        match res {
            Err(Error::InvalidDistribution { line, .. }) => line,
            other => panic!("expected an invalid distribution, got {:?}", other),
        }
    }

    #[test]
    fn parse_skips_comments_and_blanks() {
        let dist: SizeDistribution = "# prob size\n\n0.25 1\n  # indented comment\n0.5 2.0\n1.0 10\n"
            .parse()
            .unwrap();
        assert_eq!(dist.rows(), &[(0.25, 1), (0.5, 2), (1.0, 10)]);
    }

    #[test]
    fn parse_reports_line_numbers() {
        assert_eq!(invalid_line("0.5 1\n0.4 2\n1.0 3\n".parse()), 2);
        assert_eq!(invalid_line("# header\n0.5\n1.0 3\n".parse()), 2);
        assert_eq!(invalid_line("0.5 1\n0.9 2\n".parse()), 2);
        assert_eq!(invalid_line("0.5 1\n1.0 2.5\n".parse()), 2);
        assert_eq!(invalid_line("0.5 x\n1.0 2\n".parse()), 1);
        assert_eq!(invalid_line("0.5 0\n1.0 2\n".parse()), 1);
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!("# nothing here\n".parse::<SizeDistribution>().is_err());
        assert!(SizeDistribution::new(vec![]).is_err());
    }

    #[test]
    fn repeated_probability_is_rejected() {
        assert_eq!(invalid_line(SizeDistribution::new(vec![(0.5, 1), (0.5, 2), (1.0, 3)])), 2);
    }

    #[test]
    fn mean_size() {
        let dist = SizeDistribution::new(vec![(0.5, 1), (1.0, 2)]).unwrap();
        assert_abs_diff_eq!(dist.mean(), 1.5);

        let dist = SizeDistribution::new(vec![(0.25, 4), (0.75, 8), (1.0, 100)]).unwrap();
        assert_abs_diff_eq!(dist.mean(), 1.0 + 4.0 + 25.0);
    }

    #[test]
    fn samples_are_declared_sizes() {
        let dist = SizeDistribution::new(vec![(0.1, 1), (0.3, 3), (0.999_999_5, 7)]).unwrap();
        let mut rng = rng();
        let declared: Vec<_> = dist.sizes().collect();
        for _ in 0..10_000 {
            let size = dist.sample(&mut rng);
            assert!(declared.contains(&size), "{} is not declared", size);
        }
    }

    #[test]
    fn sample_frequencies_follow_table() {
        let dist = SizeDistribution::new(vec![(0.5, 1), (1.0, 2)]).unwrap();
        let n = 20_000;
        let ones = rng().sample_iter(&dist).take(n).filter(|s| *s == 1).count();
        assert_abs_diff_eq!(ones as f64 / n as f64, 0.5, epsilon = 0.02);
    }

    #[test]
    fn delay_is_at_least_fixed() {
        let model = DelayModel::new(3.0, 1).unwrap();
        let n = 20_000;
        let samples: Vec<u64> = rng().sample_iter(&model).take(n).collect();
        assert!(samples.iter().all(|d| *d >= 1));
        let mean = samples.iter().sum::<u64>() as f64 / n as f64;
        assert_abs_diff_eq!(mean, model.mean(), epsilon = 0.1);
    }

    #[test]
    fn zero_avg_delay_is_constant() {
        let model = DelayModel::new(0.0, 2).unwrap();
        assert!(rng().sample_iter(&model).take(100).all(|d| d == 2));
    }

    #[test]
    fn bad_avg_delay_is_rejected() {
        assert!(DelayModel::new(-1.0, 1).is_err());
        assert!(DelayModel::new(f64::NAN, 1).is_err());
        assert!(DelayModel::new(f64::INFINITY, 1).is_err());
    }
}
