use matmul_benchmark_rs::pipeline::{self, PipelineConfig};
use matmul_benchmark_rs::runner::Layout;

fn print_usage(program: &str) {
    eprintln!("Usage: {} <executable_path> <version_label> [core_id]", program);
    eprintln!(
        "       {} <executable_path> <version_label> <repeat_count> <left|right> [core_id]",
        program
    );
    eprintln!("  <executable_path> - Matrix-multiplication benchmark to drive");
    eprintln!("  <version_label>   - Column label for this run in the result table");
    eprintln!("  <repeat_count>    - Trials per size (at least 1)");
    eprintln!("  [core_id]         - Optional CPU core ID for pinning");
}

fn parse_core_id(arg: &str) -> usize {
    arg.parse::<usize>().unwrap_or_else(|_| {
        eprintln!("Error: invalid core_id '{}'. Must be a valid number.", arg);
        std::process::exit(1);
    })
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    let executable = args[1].as_str();
    let version_label = args[2].as_str();

    let config = if args.len() >= 5 {
        let repeats = args[3].parse::<usize>().unwrap_or_else(|_| {
            eprintln!(
                "Error: invalid repeat_count '{}'. Must be a valid number.",
                args[3]
            );
            std::process::exit(1);
        });
        if repeats < 1 {
            eprintln!("Error: repeat_count must be at least 1.");
            std::process::exit(1);
        }
        let layout = Layout::parse(&args[4]).unwrap_or_else(|| {
            eprintln!("Error: unknown layout '{}'. Use 'left' or 'right'.", args[4]);
            std::process::exit(1);
        });
        if args.len() > 5 {
            pipeline::set_affinity(parse_core_id(&args[5]));
        }
        PipelineConfig::multi_trial(executable, version_label, repeats, layout)
    } else {
        if args.len() > 3 {
            pipeline::set_affinity(parse_core_id(&args[3]));
        }
        PipelineConfig::single_trial(executable, version_label)
    };

    if let Err(err) = pipeline::run(&config) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
