fn main() -> anyhow::Result<()> {
    chatpulse_lib::run()
}
