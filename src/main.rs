fn main() {
    poi_density::cli::run();
}
