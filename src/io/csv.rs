/*!
# Saving Sampler Results to CSV

Writes the estimates of a finished run as a long-format CSV file. Enable via the `csv` feature.
*/

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::errors::Result;
use crate::model::PairTable;
use crate::output::SamplerOutput;

/**
Saves the statistics of a run as a CSV file.

The file has a header row `kind,i,j,value` followed by one row per estimate:
- `single,i,,p` for `P(x_i = 1)`,
- `pair,k,l,p` for `P(x_k = 1, x_l = 1)`, with `(k, l)` taken from `pairs`,
- `population,k,,p` for `P(K = k)`,
- `energy_mean,,,E[E]` and `energy_mean_sq,,,E[E²]`.

# Examples

```rust
use pairwise_maxent::config::SamplerConfig;
use pairwise_maxent::io::csv::save_statistics_csv;
use pairwise_maxent::model::PairwiseModel;
use pairwise_maxent::sampler::PairwiseGibbs;
use pairwise_maxent::state::ChainState;

let model = PairwiseModel::canonical(vec![0.0; 3], vec![0.0; 3], vec![0.0; 4]).unwrap();
let pairs = model.pairs().clone();
let out = PairwiseGibbs::new(model, ChainState::zeros(3), SamplerConfig::new(100, 10).set_seed(1))
    .unwrap()
    .run()
    .unwrap();
save_statistics_csv(&out, &pairs, "/tmp/pairwise_stats.csv")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_statistics_csv<P: AsRef<Path>>(
    output: &SamplerOutput,
    pairs: &PairTable,
    filename: P,
) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(["kind", "i", "j", "value"])?;

    for (i, p) in output.single_rates().iter().enumerate() {
        wtr.write_record(["single", &i.to_string(), "", &p.to_string()])?;
    }
    for ((k, l), p) in pairs.iter().zip(output.pair_rates().iter()) {
        wtr.write_record(["pair", &k.to_string(), &l.to_string(), &p.to_string()])?;
    }
    for (k, p) in output.population_histogram().iter().enumerate() {
        wtr.write_record(["population", &k.to_string(), "", &p.to_string()])?;
    }
    let energy = output.energy();
    wtr.write_record(["energy_mean", "", "", &energy.mean.to_string()])?;
    wtr.write_record(["energy_mean_sq", "", "", &energy.mean_sq.to_string()])?;

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SamplerConfig;
    use crate::model::PairwiseModel;
    use crate::sampler::PairwiseGibbs;
    use crate::state::ChainState;
    use csv::Reader;
    use tempfile::NamedTempFile;

    #[test]
    fn test_save_statistics_csv_rows() {
        let model =
            PairwiseModel::canonical(vec![0.0; 3], vec![0.5; 3], vec![0.0; 4]).unwrap();
        let pairs = model.pairs().clone();
        let out = PairwiseGibbs::new(model, ChainState::zeros(3), SamplerConfig::new(100, 5).set_seed(2))
            .unwrap()
            .run()
            .unwrap();

        let file = NamedTempFile::new().expect("Could not create temp file");
        save_statistics_csv(&out, &pairs, file.path()).expect("Saving statistics failed");

        let mut rdr = Reader::from_path(file.path()).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["kind", "i", "j", "value"]);

        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        // 3 singles, 3 pairs, 4 population bins, 2 energy rows
        assert_eq!(records.len(), 12);
        assert_eq!(&records[3][0], "pair");
        assert_eq!(&records[3][1], "0");
        assert_eq!(&records[3][2], "1");
        assert_eq!(&records[11][0], "energy_mean_sq");

        let hist_total: f64 = records[6..10]
            .iter()
            .map(|r| r[3].parse::<f64>().unwrap())
            .sum();
        assert!((hist_total - 1.0).abs() < 1e-9);
    }
}
