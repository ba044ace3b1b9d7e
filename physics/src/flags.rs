use num_traits::{One, PrimInt, Zero};

/// Trait implemented by flag enums declared with [`define_flags!`].
///
/// The enum's discriminant (via `#[repr(u8)]`) is the bit index; `Storage` picks the
/// backing integer.
pub trait Flag: Copy {
    type Storage: PrimInt;

    fn bit_index(self) -> u8;

    fn mask(self) -> Self::Storage {
        // NOTE: `bit_index()` must be < number of bits in `Storage`.
        Self::Storage::one() << (self.bit_index() as usize)
    }
}

/// A small set of flags of one enum type `F`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlagSet<F: Flag> {
    bits: F::Storage,
}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: Flag> FlagSet<F> {
    pub fn empty() -> Self {
        Self {
            bits: F::Storage::zero(),
        }
    }

    pub fn from_bits(bits: F::Storage) -> Self {
        Self { bits }
    }

    pub fn of(flags: &[F]) -> Self {
        let mut set = Self::empty();
        for &flag in flags {
            set.insert(flag);
        }
        set
    }

    pub fn bits(&self) -> F::Storage {
        self.bits
    }

    pub fn insert(&mut self, flag: F) {
        self.bits = self.bits | flag.mask();
    }

    pub fn remove(&mut self, flag: F) {
        self.bits = self.bits & !flag.mask();
    }

    /// Insert or remove `flag` depending on `on`.
    pub fn set(&mut self, flag: F, on: bool) {
        if on {
            self.insert(flag);
        } else {
            self.remove(flag);
        }
    }

    pub fn contains(&self, flag: F) -> bool {
        (self.bits & flag.mask()) != F::Storage::zero()
    }

    pub fn contains_any(&self, flags: &[F]) -> bool {
        flags.iter().any(|&f| self.contains(f))
    }

    pub fn is_empty(&self) -> bool {
        self.bits == F::Storage::zero()
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Return the current set and leave `self` empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// Declare a `#[repr(u8)]` flag enum and implement [`Flag`] for it.
///
/// Example:
/// ```rust
/// kart_physics::define_flags!(Surface, u8, {
///     Wet,
///     Icy,
/// });
/// ```
#[macro_export]
macro_rules! define_flags {
    (
        $(#[$meta:meta])* $name:ident, $storage:ty,
        { $($(#[$vmeta:meta])* $variant:ident),* $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant),*
        }

        impl $crate::flags::Flag for $name {
            type Storage = $storage;

            fn bit_index(self) -> u8 {
                self as u8
            }
        }
    };
}
