fn main() -> eframe::Result {
    text_eraser::run_native()
}
