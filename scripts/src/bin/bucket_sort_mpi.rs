//! Run a distributed bucket sort, one key range per MPI process
use bucketsort::{bucket_sort, generator::generate, MpiTransport, Transport};
use clap::Parser;
use mpi::traits::Communicator;
use rayon::ThreadPoolBuilder;
use scripts::{init_logging, print_sequence, print_summary, write_load_balance, SortArgs};
use tracing::{error, info};

/// Struct for parsing command-line arguments
#[derive(Parser)]
struct Args {
    #[command(flatten)]
    sort: SortArgs,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (universe, _threading) = mpi::initialize_with_threading(mpi::Threading::Funneled)
        .ok_or("MPI is already initialised")?;
    let world = universe.world();
    let comm = MpiTransport::new(&world);

    let args = Args::parse();
    init_logging(&args.sort.log_level);

    ThreadPoolBuilder::new()
        .num_threads(args.sort.n_threads)
        .build_global()?;

    let config = args.sort.config();

    // Only the coordinator holds the dataset
    let dataset = if comm.context().is_coordinator() {
        info!(
            n_processes = comm.size(),
            n_elements = config.n_elements,
            distribution = %config.distribution,
            "starting bucket sort"
        );

        // A missing dataset is rejected by every rank in the sort
        match generate(
            config.n_elements,
            config.min,
            config.max,
            config.distribution,
            config.seed,
        ) {
            Ok(dataset) => {
                if args.sort.print_array {
                    print_sequence("Input", &dataset);
                }
                Some(dataset)
            }
            Err(e) => {
                error!(rank = world.rank(), "{}", e);
                None
            }
        }
    } else {
        None
    };

    let output = match bucket_sort(dataset.as_deref(), &config, &comm) {
        Ok(output) => output,
        Err(e) => {
            error!(rank = world.rank(), "{}", e);
            return Err(e.into());
        }
    };

    if let Some(summary) = &output.summary {
        for (rank, elements, sort_time) in summary.load_balance.rows() {
            println!(
                "Rank {} -> Elements: {} | Sort: {:.6}s",
                rank, elements, sort_time
            );
        }
    }

    print_summary(&output, &args.sort);

    if let (Some(path), Some(summary)) = (&args.sort.csv, &output.summary) {
        write_load_balance(path, &summary.load_balance)?;
    }

    Ok(())
}
