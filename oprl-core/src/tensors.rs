// TODO: re evaluate whether we need dedicated new types or not
use candle_core::Tensor;
use derive_more::{Deref, DerefMut, Display};

#[derive(Deref, DerefMut, Debug, Display)]
pub struct ActorLoss(pub Tensor);

#[derive(Deref, DerefMut, Debug, Display)]
pub struct CriticLoss(pub Tensor);
