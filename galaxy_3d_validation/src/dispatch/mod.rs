/// Call dispatch: call shapes, the interceptor and the layer entry points

pub mod call;
pub mod interceptor;
pub mod layer;

pub use call::{Call, CallShape, CommandIds};
pub use interceptor::{Interceptor, Phase};
pub use layer::ValidationLayer;
