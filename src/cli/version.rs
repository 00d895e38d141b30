/// Display version information
pub fn execute() {
    println!("grantvote {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for grant application committee voting");
}
