use shadeport::ShadeportError;
use shadeport::run;

fn main() -> Result<(), ShadeportError> {
    run(std::env::args().collect())
}
