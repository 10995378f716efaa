//! Run a bucket sort over logical processes sharing this process
use bucketsort::{bucket_sort, generator::generate, LocalCluster, Transport, COORDINATOR_RANK};
use clap::{builder::RangedU64ValueParser, Parser};
use rayon::ThreadPoolBuilder;
use scripts::{init_logging, print_sequence, print_summary, write_load_balance, SortArgs};
use tracing::info;

/// Struct for parsing command-line arguments
#[derive(Parser)]
struct Args {
    /// Number of logical processes, at least one
    #[arg(long, default_value_t = 4, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    n_processes: usize,

    #[command(flatten)]
    sort: SortArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.sort.log_level);

    ThreadPoolBuilder::new()
        .num_threads(args.sort.n_threads)
        .build_global()?;

    let config = args.sort.config();
    let cluster = LocalCluster::new(args.n_processes);
    let dataset = generate(
        config.n_elements,
        config.min,
        config.max,
        config.distribution,
        config.seed,
    )?;

    info!(
        n_processes = cluster.size(),
        n_elements = config.n_elements,
        distribution = %config.distribution,
        "starting bucket sort"
    );

    if args.sort.print_array {
        print_sequence("Input", &dataset);
    }

    let outputs = cluster.run(|comm| {
        let data = comm.context().is_coordinator().then_some(&dataset[..]);
        bucket_sort(data, &config, &comm)
    });

    let outputs = outputs.into_iter().collect::<Result<Vec<_>, _>>()?;

    for output in outputs.iter() {
        println!("{}", output.report);
    }

    let coordinator = outputs
        .get(COORDINATOR_RANK)
        .ok_or("no process was run, at least one is required")?;
    print_summary(coordinator, &args.sort);

    if let (Some(path), Some(summary)) = (&args.sort.csv, &coordinator.summary) {
        write_load_balance(path, &summary.load_balance)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_process_count_must_be_positive() {
        assert!(Args::try_parse_from(["bucket_sort_local", "--n-processes", "0"]).is_err());

        let args = Args::try_parse_from(["bucket_sort_local", "--n-processes", "3"]).unwrap();
        assert_eq!(args.n_processes, 3);

        let args = Args::try_parse_from(["bucket_sort_local"]).unwrap();
        assert_eq!(args.n_processes, 4);
    }
}
