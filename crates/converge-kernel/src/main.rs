use clap::{value_parser, Arg, ArgAction, Command};
use converge_kernel::logging::{self, Event, EventLog};
use converge_kernel::test_harness::{run_simulator, SimulatorConfig, TestHarness};

fn main() -> anyhow::Result<()> {
    logging::init_diagnostics();

    let cli = Command::new("converge-kernel")
        .version(converge_kernel::VERSION)
        .about("Converge resilient-operation executor")
        .arg_required_else_help(false)
        .subcommand(
            Command::new("simulate")
                .about("Drive the executor against a simulated flaky host")
                .arg(
                    Arg::new("goals")
                        .long("goals")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of goals to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("flakiness")
                        .long("flakiness")
                        .default_value("0.3")
                        .value_parser(value_parser!(f64))
                        .help("Per-attempt probability a strategy fails to take effect"),
                )
                .arg(
                    Arg::new("satisfied")
                        .long("satisfied")
                        .default_value("0.2")
                        .value_parser(value_parser!(f64))
                        .help("Share of goals whose end-state already holds"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop simulation on first violation"),
                )
                .arg(
                    Arg::new("journal-out")
                        .long("journal-out")
                        .help("Write the execution journal to this JSON file"),
                ),
        )
        .subcommand(
            Command::new("validate-log")
                .about("Verify execution journal integrity")
                .arg(
                    Arg::new("path")
                        .long("path")
                        .help("Path to an exported journal JSON file"),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Run certification across seeds and report")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        );

    let matches = cli.get_matches();

    match matches.subcommand() {
        Some(("simulate", args)) => {
            let goals = *args.get_one::<u64>("goals").unwrap();
            let seed = *args.get_one::<u64>("seed").unwrap();
            let flakiness = *args.get_one::<f64>("flakiness").unwrap();
            let satisfied = *args.get_one::<f64>("satisfied").unwrap();
            let stop_on_violation = args.get_flag("stop-on-violation");

            println!("Running Converge Simulator...");
            println!("Goals: {}", goals);
            println!("Seed: {}", seed);
            println!();

            let config = SimulatorConfig {
                seed,
                total_goals: goals,
                flakiness,
                satisfied_ratio: satisfied,
                stop_on_first_violation: stop_on_violation,
                ..Default::default()
            };

            let report = run_simulator(config);

            println!("{}", report.generate_text());

            if let Some(path) = args.get_one::<String>("journal-out") {
                std::fs::write(path, serde_json::to_string_pretty(&report.journal)?)?;
                println!("Journal written to: {}", path);
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("validate-log", args)) => {
            let log = if let Some(path) = args.get_one::<String>("path") {
                println!("Validating journal at: {}", path);
                let raw = std::fs::read_to_string(path)?;
                let events: Vec<Event> = serde_json::from_str(&raw)?;
                EventLog::from_events(events)
            } else {
                println!("No path given; validating the journal of a fresh simulation run...");
                let report = run_simulator(SimulatorConfig {
                    total_goals: 200,
                    ..Default::default()
                });
                EventLog::from_events(report.journal)
            };

            match log.verify_integrity() {
                Ok(()) => {
                    println!("Log integrity: VALID");
                    println!("Events checked: {}", log.len());
                }
                Err(error) => {
                    println!("Log integrity: INVALID ({})", error);
                    println!("Events checked: {}", log.len());
                    std::process::exit(1);
                }
            }
        }
        Some(("report", args)) => {
            let json = args.get_flag("json");

            let cert = TestHarness::run_certification();

            if json {
                println!("{}", serde_json::to_string_pretty(&cert)?);
            } else {
                println!("Converge Certification Report");
                println!("=============================");
                println!();
                println!("Kernel Version: {}", converge_kernel::VERSION);
                println!("Seeds Tested: {}", cert.seeds_tested);
                println!("Total Violations: {}", cert.total_violations);
                println!();
                println!("Result: {}", if cert.passed { "PASS" } else { "FAIL" });
            }

            std::process::exit(if cert.passed { 0 } else { 1 });
        }
        _ => {}
    }

    Ok(())
}
