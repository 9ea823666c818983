fn main() {
    std::process::exit(stac_stocktake::app::startup::startup());
}
