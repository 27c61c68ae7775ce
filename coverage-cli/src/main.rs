use std::ops::RangeInclusive;

use anyhow::{bail, Context};
use clap::{arg, command, value_parser, ArgMatches, Command};
use coverage_db::{validate_network, Store};
use coverage_lib::{bucketize, plan_with, reconcile_network, PlanOptions, ReconcileOptions};
use dotenv::dotenv;
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::{get_cli_config, CliConfig};

mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional at runtime
    dotenv()
        .inspect_err(|err| eprintln!("[WARN] reading .env files is failed with err {err}"))
        .ok();

    let config = get_cli_config()?;

    // logs
    let (non_blocking_appender, _guard_stderr) = tracing_appender::non_blocking(std::io::stderr());
    let stderr_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_filter(config.rust_log);
    tracing_subscriber::registry()
        .with(stderr_subscriber)
        .init();

    let matches = cli().get_matches();
    run(&config, &matches).await
}

fn cli() -> Command {
    command!() // requires `cargo` feature
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("bucketize")
                .about("split [0, TOTAL] into contiguous buckets")
                .arg(arg!(<TOTAL>).value_parser(value_parser!(u64)))
                .arg(arg!(<BUCKETS>).value_parser(value_parser!(u32))),
        )
        .subcommand(
            Command::new("plan")
                .about("split [FROM, TO] into worker tasks")
                .arg(arg!(<FROM>).value_parser(value_parser!(u64)))
                .arg(arg!(<TO>).value_parser(value_parser!(u64)))
                .arg(arg!(<WORKERS>).value_parser(value_parser!(u32)))
                .arg(arg!(--force "reindex blocks that are already indexed"))
                .arg(arg!(--"log-level" <LEVEL> "worker log level").default_value("info")),
        )
        .subcommand(
            Command::new("reconcile")
                .alias("r")
                .about("report the blocks of NETWORK that are not indexed yet")
                .arg(arg!(<NETWORK>))
                .arg(arg!(-b --buckets <COUNT> "number of buckets").value_parser(value_parser!(u32)))
                .arg(arg!(--runs "print missing blocks as inclusive runs only")),
        )
        .subcommand(
            Command::new("mark-indexed")
                .about("record blocks of NETWORK as indexed")
                .arg(arg!(<NETWORK>))
                .arg(arg!(<BLOCKS> ... "block numbers or inclusive ranges such as 10-20")),
        )
        .subcommand(
            Command::new("unmark")
                .about("forget indexed blocks of NETWORK so they are reported missing again")
                .arg(arg!(<NETWORK>))
                .arg(arg!(<BLOCKS> ... "block numbers or inclusive ranges such as 10-20")),
        )
        .subcommand(
            Command::new("set-latest")
                .about("record the chain head of NETWORK")
                .arg(arg!(<NETWORK>))
                .arg(arg!(<BLOCK>).value_parser(value_parser!(u64))),
        )
        .subcommand(
            Command::new("stats")
                .about("show the chain head and indexed block count of NETWORK")
                .arg(arg!(<NETWORK>)),
        )
}

async fn run(config: &CliConfig, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("bucketize", sub_matches)) => {
            let total = *required::<u64>(sub_matches, "TOTAL")?;
            let buckets = *required::<u32>(sub_matches, "BUCKETS")?;
            print_json(&bucketize(total, buckets)?)
        }
        Some(("plan", sub_matches)) => {
            let from = *required::<u64>(sub_matches, "FROM")?;
            let to = *required::<u64>(sub_matches, "TO")?;
            let workers = *required::<u32>(sub_matches, "WORKERS")?;
            let options = PlanOptions::builder()
                .force_mode(sub_matches.get_flag("force"))
                .log_level(required::<String>(sub_matches, "log-level")?.as_str())
                .build();
            print_json(&plan_with(from, to, workers, &options)?)
        }
        Some((name, sub_matches)) => {
            let store = Store::open(config.db_path())?;
            run_store_command(&store, config, name, sub_matches).await
        }
        None => Ok(()),
    }
}

async fn run_store_command(
    store: &Store,
    config: &CliConfig,
    name: &str,
    sub_matches: &ArgMatches,
) -> anyhow::Result<()> {
    let network = network(sub_matches)?;
    match name {
        "reconcile" => {
            let options = ReconcileOptions::builder()
                .bucket_count(
                    sub_matches
                        .get_one::<u32>("buckets")
                        .copied()
                        .unwrap_or(config.default_bucket_count),
                )
                .page_size(config.page_size)
                .build();
            let result = reconcile_network(store, store, network, options).await?;
            if sub_matches.get_flag("runs") {
                print_json(&result.missing_ranges())
            } else {
                print_json(&result)
            }
        }
        "mark-indexed" => {
            let ranges = block_ranges(sub_matches)?;
            let mut marked = 0;
            for range in ranges {
                marked += store.indexed_blocks().mark_indexed_many(network, range)?;
            }
            info!(network, marked, "Marked blocks as indexed");
            print_json(&json!({ "network": network, "marked": marked }))
        }
        "unmark" => {
            let mut unmarked = 0u64;
            for block in block_ranges(sub_matches)?.into_iter().flatten() {
                store.indexed_blocks().unmark(network, block)?;
                unmarked += 1;
            }
            info!(network, unmarked, "Unmarked indexed blocks");
            print_json(&json!({ "network": network, "unmarked": unmarked }))
        }
        "set-latest" => {
            let block = *required::<u64>(sub_matches, "BLOCK")?;
            store.metadata().set_latest_block(network, block)?;
            info!(network, block, "Recorded chain head");
            print_json(&json!({ "network": network, "latest": block }))
        }
        "stats" => print_json(&json!({
            "network": network,
            "latest": store.metadata().get_latest_block(network)?,
            "indexed_count": store.indexed_count(network)?,
            "approximate_total_indexed": store.indexed_blocks().approximate_len(),
        })),
        _ => bail!("unknown command {name}"),
    }
}

fn required<'a, T: Clone + Send + Sync + 'static>(
    matches: &'a ArgMatches,
    id: &str,
) -> anyhow::Result<&'a T> {
    matches
        .get_one::<T>(id)
        .with_context(|| format!("missing {id}"))
}

fn network(matches: &ArgMatches) -> anyhow::Result<&str> {
    let network = required::<String>(matches, "NETWORK")?;
    validate_network(network)?;
    Ok(network)
}

fn block_ranges(matches: &ArgMatches) -> anyhow::Result<Vec<RangeInclusive<u64>>> {
    matches
        .get_many::<String>("BLOCKS")
        .context("missing BLOCKS")?
        .map(|blocks| parse_blocks(blocks))
        .collect()
}

/// Parses `N` or an inclusive `FROM-TO` range.
fn parse_blocks(blocks: &str) -> anyhow::Result<RangeInclusive<u64>> {
    let (from, to) = match blocks.split_once('-') {
        Some((from, to)) => (from.trim(), to.trim()),
        None => (blocks.trim(), blocks.trim()),
    };
    let from = from
        .parse::<u64>()
        .with_context(|| format!("invalid block number in {blocks:?}"))?;
    let to = to
        .parse::<u64>()
        .with_context(|| format!("invalid block number in {blocks:?}"))?;
    if to < from {
        bail!("range {blocks:?} ends before it starts");
    }
    Ok(from..=to)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
