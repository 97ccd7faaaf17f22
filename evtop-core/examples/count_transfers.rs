#![allow(clippy::print_stdout)]
//! Count ERC-20 `Transfer` events over the full history of a chain.
//!
//! Usage:
//!   cargo run --example `count_transfers`
//!
//! This example resolves the public Ethereum endpoint through the network
//! registry, streams every matching log from block zero, and prints a
//! running count until the stream catches up to the chain tip.

use evtop_core::{Client, NetworkRegistry, Scanner, SignatureIndex};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = NetworkRegistry::new("cache/networks.json");
    registry.refresh(false).await;

    let index = SignatureIndex::new(["Transfer(address,address,uint256)"]);
    let client = Client::new(registry.resolve("eth")?)?;
    let mut scan = Scanner::new(client.session(&index), index);

    scan.start().await?;
    let mut batches = 0u64;
    while scan.step().await? {
        batches += 1;
        if batches % 200 == 0 {
            let s = scan.snapshot();
            println!(
                "{:>5.1}%  block {:>9}  {} transfers  ({:.0}/s)",
                s.progress * 100.0,
                s.cursor,
                s.total,
                s.events_per_sec
            );
        }
    }

    let s = scan.snapshot();
    println!(
        "done: {} transfers across {} blocks in {:.1}s",
        s.total, s.height, s.elapsed_secs
    );
    Ok(())
}
