use tracing_subscriber::EnvFilter;
use ze_topo::discovery::{DiscoveryConfig, discover_reasserting_sysman};
use ze_topo::topology::{Topology, scan_sysfs};
use ze_topo::ze::ZeLoader;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("============================================================");
    println!("              Level Zero Topology Discovery                 ");
    println!("============================================================");

    let mut topology = Topology::new();
    match scan_sysfs(&mut topology) {
        Ok(n) => println!("[+] PCI: {n} objects from sysfs"),
        Err(e) => eprintln!("[-] PCI scan failed: {e} (devices will hang below the root)"),
    }

    let loader = match ZeLoader::open() {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("[-] {e}");
            eprintln!("    (Install the oneAPI Level Zero loader or set ZE_TOPO_LOADER_PATH)");
            std::process::exit(1);
        }
    };

    let config = DiscoveryConfig::from_env();
    // SAFETY: single-threaded; nothing else touches the environment here.
    let report = unsafe { discover_reasserting_sysman(&loader, &mut topology, &config) };
    println!(
        "[+] Level Zero: {} devices, {} warnings",
        report.devices.len(),
        report.warnings.len()
    );

    println!("\n{topology}");
}
