//! Shared command line handling and reporting for the bucket sort drivers
use std::path::Path;

use bucketsort::{
    config::{BucketSortConfig, Distribution, RemainderPolicy},
    helpers::format_sequence,
    instrumentation::LoadBalance,
    BucketSortOutput, LocalSortKind,
};
use clap::Args;
use csv::Writer;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Key type sorted by the drivers
pub type KeyType = i64;

/// Sequences longer than this are not printed with `--print-array`
pub const MAX_PRINTED: usize = 1000;

/// Arguments common to every driver
#[derive(Args, Debug, Clone)]
pub struct SortArgs {
    /// Number of keys in the global dataset
    #[arg(long, default_value_t = 1_000_000)]
    pub n_elements: usize,

    /// Smallest admissible key
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub min: KeyType,

    /// Largest admissible key
    #[arg(long, default_value_t = 1_000_000, allow_hyphen_values = true)]
    pub max: KeyType,

    /// Key distribution (uniform, normal, exponential)
    #[arg(long, default_value_t = Distribution::Uniform)]
    pub distribution: Distribution,

    /// Treatment of N mod P leftover keys (distribute, truncate, reject)
    #[arg(long, default_value_t = RemainderPolicy::Distribute)]
    pub remainder: RemainderPolicy,

    /// Local sort (unstable, parallel)
    #[arg(long, default_value_t = LocalSortKind::Unstable)]
    pub local_sort: LocalSortKind,

    /// Number of threads per process for the parallel local sort
    #[arg(long, default_value_t = 1)]
    pub n_threads: usize,

    /// Generator seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the input and sorted sequences
    #[arg(long, default_value_t = false)]
    pub print_array: bool,

    /// Write per rank partition sizes and sort times to this file
    #[arg(long)]
    pub csv: Option<String>,

    /// Log filter, `RUST_LOG` takes precedence
    #[arg(long, default_value_t = String::from("info"))]
    pub log_level: String,
}

impl SortArgs {
    /// Run configuration described by the arguments
    pub fn config(&self) -> BucketSortConfig<KeyType> {
        let config = BucketSortConfig::new(self.n_elements, self.min, self.max)
            .with_distribution(self.distribution)
            .with_remainder(self.remainder)
            .with_local_sort(self.local_sort);

        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

/// Install a formatting subscriber filtered by `RUST_LOG`, or by `level` when unset.
pub fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

/// Print a sequence if it is short enough to be read.
pub fn print_sequence(label: &str, values: &[KeyType]) {
    if values.len() <= MAX_PRINTED {
        println!("{}: {}", label, format_sequence(values));
    } else {
        println!("{}: {} values, not printed", label, values.len());
    }
}

/// Print the coordinator's summary, and the sorted sequence if requested.
pub fn print_summary(output: &BucketSortOutput<KeyType>, args: &SortArgs) {
    let Some(summary) = &output.summary else {
        return;
    };

    println!("{}", summary);
    if output.dropped > 0 {
        println!("Dropped Elements: {}", output.dropped);
    }

    if args.print_array {
        if let Some(sorted) = &output.sorted {
            print_sequence("Sorted", sorted);
        }
    }
}

/// Write one `rank,elements,sort_time_s` row per rank.
pub fn write_load_balance<P: AsRef<Path>>(
    path: P,
    load_balance: &LoadBalance,
) -> Result<(), csv::Error> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["rank", "elements", "sort_time_s"])?;

    for (rank, elements, sort_time) in load_balance.rows() {
        writer.write_record(&[
            rank.to_string(),
            elements.to_string(),
            format!("{:.9}", sort_time),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        sort: SortArgs,
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::parse_from([
            "bucket_sort",
            "--n-elements",
            "20",
            "--min",
            "-10",
            "--max",
            "10",
            "--distribution",
            "exponential",
            "--remainder",
            "truncate",
            "--seed",
            "3",
        ]);

        let config = cli.sort.config();
        assert_eq!(config.n_elements, 20);
        assert_eq!((config.min, config.max), (-10, 10));
        assert_eq!(config.distribution, Distribution::Exponential);
        assert_eq!(config.remainder, RemainderPolicy::Truncate);
        assert_eq!(config.local_sort, LocalSortKind::Unstable);
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn test_rejects_unknown_distribution() {
        assert!(Cli::try_parse_from(["bucket_sort", "--distribution", "gamma"]).is_err());
    }

    #[test]
    fn test_write_load_balance() {
        let path = std::env::temp_dir().join(format!(
            "bucket_sort_load_balance_{}.csv",
            std::process::id()
        ));
        let load_balance = LoadBalance {
            partition_sizes: vec![3, 5],
            sort_times: vec![0.5, 0.25],
        };

        write_load_balance(&path, &load_balance).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "rank,elements,sort_time_s");
        assert_eq!(lines[1], "0,3,0.500000000");
        assert_eq!(lines[2], "1,5,0.250000000");
    }
}
