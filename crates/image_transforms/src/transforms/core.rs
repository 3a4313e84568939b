use anyhow::{Context, Result};
use std::any::type_name;
use std::marker::PhantomData;

/// Turns an `I` into an `O`.
///
/// Implemented by single steps such as [`LoadImage`](super::vision::LoadImage)
/// and by whole [`Compose`](super::Compose) pipelines, so a loader and a
/// resolved pipeline compose with [`Transform::then`]:
///
/// ```ignore
/// let pipeline = LoadImage::new().then(get_transforms(settings)?);
/// let output = pipeline.apply(PathBuf::from("bottle/good/000.png"))?;
/// ```
pub trait Transform<I, O>: Send + Sync {
    fn apply(&self, input: I) -> Result<O>;

    /// Feeds this step's output into `next`.
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain::new(self, next)
    }
}

/// `first` followed by `second`; `M` is the type passed between them.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        let intermediate = self
            .first
            .apply(input)
            .with_context(|| format!("`{}` failed before `{}`", type_name::<A>(), type_name::<B>()))?;
        self.second
            .apply(intermediate)
            .with_context(|| format!("`{}` failed after `{}`", type_name::<B>(), type_name::<A>()))
    }
}
