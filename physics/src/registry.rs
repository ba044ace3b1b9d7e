//! Arena of karts addressed by stable, generation-checked ids.
//!
//! Removing a kart bumps its slot's generation, so ids held by other systems
//! (HUD, AI, race rules) become stale instead of silently pointing at whichever
//! kart reuses the slot.

use crate::{
    error::RegistryError,
    integrator::{KartIntegrator, StepContext},
    types::ControlInputs,
};

/// Packed kart handle.
///
/// # Bit layout
/// - bits 0..=31  : slot index
/// - bits 32..=63 : slot generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KartId(u64);

impl KartId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self((index as u64) | ((generation as u64) << u32::BITS))
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn to_bits(self) -> u64 {
        self.0
    }

    pub fn index(self) -> u32 {
        (self.0 & u32::MAX as u64) as u32
    }

    pub fn generation(self) -> u32 {
        (self.0 >> u32::BITS) as u32
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    kart: Option<KartIntegrator>,
}

#[derive(Debug, Default)]
pub struct KartRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl KartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kart: KartIntegrator) -> KartId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.kart = Some(kart);
            return KartId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            kart: Some(kart),
        });
        KartId::new(index, 0)
    }

    pub fn remove(&mut self, id: KartId) -> Result<KartIntegrator, RegistryError> {
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .ok_or(RegistryError::StaleKart(id.to_bits()))?;
        let kart = slot.kart.take().ok_or(RegistryError::StaleKart(id.to_bits()))?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        self.len -= 1;
        Ok(kart)
    }

    pub fn get(&self, id: KartId) -> Result<&KartIntegrator, RegistryError> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.kart.as_ref())
            .ok_or(RegistryError::StaleKart(id.to_bits()))
    }

    pub fn get_mut(&mut self, id: KartId) -> Result<&mut KartIntegrator, RegistryError> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.kart.as_mut())
            .ok_or(RegistryError::StaleKart(id.to_bits()))
    }

    pub fn contains(&self, id: KartId) -> bool {
        self.get(id).is_ok()
    }

    pub fn set_controls(&mut self, id: KartId, controls: ControlInputs) -> Result<(), RegistryError> {
        self.get_mut(id)?.set_controls(controls);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live karts in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (KartId, &KartIntegrator)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.kart
                .as_ref()
                .map(|kart| (KartId::new(i as u32, slot.generation), kart))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (KartId, &mut KartIntegrator)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, slot)| {
            let generation = slot.generation;
            slot.kart
                .as_mut()
                .map(|kart| (KartId::new(i as u32, generation), kart))
        })
    }

    /// Advance every kart by the same frame time, in slot order.
    pub fn advance_all(&mut self, real_dt: f32, ctx: &StepContext<'_>) {
        for (_, kart) in self.iter_mut() {
            kart.advance(real_dt, ctx);
        }
    }

    pub fn start_all(&mut self) {
        for (_, kart) in self.iter_mut() {
            kart.start();
        }
    }
}
