use packetlab::builder::TopologyBuilder;
use packetlab::{simulate, PacketSpec, SimulationOptions};

fn main() {
    tracing_subscriber::fmt::init();

    println!("═══════════════════════════════════════════════════════");
    println!("  PacketLab — Deterministic Packet Simulator");
    println!("  Demo: routed ping with hop-by-hop trace");
    println!("═══════════════════════════════════════════════════════");
    println!();

    // Host A ── Router R1 ── Host B, one subnet per side.
    let topo = TopologyBuilder::new()
        .host("a", "02:AA:00:00:00:01", "10.0.0.10/24")
        .host("b", "02:AA:00:00:00:02", "10.0.1.10/24")
        .router("r1", &[("eth0", "10.0.0.1/24"), ("eth1", "10.0.1.1/24")])
        .link("a", "eth0", "r1", "eth0")
        .link("b", "eth0", "r1", "eth1")
        .build();

    let spec = PacketSpec::ping("a", "b");

    let run1 = simulate(&topo, &spec, SimulationOptions::default());
    println!("  Result: success={} reason={:?}", run1.success, run1.reason);
    println!();
    for hop in &run1.trace {
        println!("    {}", hop);
    }
    println!();

    // Identical replay: same topology, same spec, same trace.
    let run2 = simulate(&topo, &spec, SimulationOptions::default());
    if run1 == run2 {
        println!("  ✓ Traces are IDENTICAL — deterministic replay confirmed.");
    } else {
        println!("  ✗ MISMATCH — determinism violation detected!");
    }
}
