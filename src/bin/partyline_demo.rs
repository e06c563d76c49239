fn main() -> anyhow::Result<()> {
    partyline::cli::run_cli()
}
