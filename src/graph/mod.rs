pub mod expr;
mod font;
pub mod render;

pub use expr::{ evaluate_function, EvalError, ExprError, Function };
pub use render::{ GraphRenderer, RenderError };
