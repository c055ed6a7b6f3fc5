mod result;
mod runner;

fn main() -> std::io::Result<()> {
    runner::run().analyze()
}
