fn main() -> anyhow::Result<()> {
    co2_logger_lib::run()
}
