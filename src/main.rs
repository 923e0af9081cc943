fn main() {
    clipkeep_lib::run()
}
