mod app;
mod blob;
mod config;
mod contour;
mod forces;
mod geom;
mod palette;
mod pointer;
mod render;
mod sim;
mod surface;
mod term;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
