use circdd_parser::load_file::load_file;

fn main() {
    for arg in std::env::args().skip(1) {
        println!("\nloading {arg} ...");
        if let Some(models) = load_file(arg) {
            for model in models {
                print!("{model}");
            }
        }
    }
}
