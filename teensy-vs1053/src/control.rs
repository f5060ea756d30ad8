/// Runtime control of an output device that sits behind a bus.
///
/// [`Vs1053`](crate::codec::Vs1053) implements this so application code can
/// treat the decoder like any other audio output stage.
pub trait AudioControl {
    /// Bus or device error.
    type Error;

    /// Power the device up and load its default state.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Power the analog output down. Register contents are kept.
    fn disable(&mut self) -> Result<(), Self::Error>;

    /// Set output gain on both channels (0.0 = silent, 1.0 = full scale).
    fn volume(&mut self, level: f32) -> Result<(), Self::Error>;
}
