fn main() -> anyhow::Result<()> {
    uplifter_lib::run()
}
