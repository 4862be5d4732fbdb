use crate::replay_buffer::ReplayBuffer;
use bincode::{
    BorrowDecode, Decode, Encode,
    error::{DecodeError, EncodeError},
};
use candle_core::{Device, Result, Tensor};

// Snapshots always land on the CPU; a buffer loaded on another machine re-uploads lazily when
// batches are sampled.

impl Encode for ReplayBuffer {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> std::result::Result<(), bincode::error::EncodeError> {
        let writer_config = bincode::config::standard();
        self.capacity.encode(encoder)?;
        let states = self
            .states
            .iter()
            .map(|t| t.to_vec1::<f32>())
            .collect::<Result<Vec<_>>>()
            .map_err(|err| EncodeError::OtherString(err.to_string()))?;
        bincode::encode_into_writer(&states, &mut encoder.writer(), writer_config)?;
        let actions = self
            .actions
            .iter()
            .map(|t| t.to_vec1::<f32>())
            .collect::<Result<Vec<_>>>()
            .map_err(|err| EncodeError::OtherString(err.to_string()))?;
        bincode::encode_into_writer(&actions, &mut encoder.writer(), writer_config)?;
        let next_states = self
            .next_states
            .iter()
            .map(|t| t.to_vec1::<f32>())
            .collect::<Result<Vec<_>>>()
            .map_err(|err| EncodeError::OtherString(err.to_string()))?;
        bincode::encode_into_writer(&next_states, &mut encoder.writer(), writer_config)?;
        bincode::encode_into_writer(&self.rewards, &mut encoder.writer(), writer_config)?;
        bincode::encode_into_writer(&self.dones, &mut encoder.writer(), writer_config)?;
        Ok(())
    }
}

fn tensors_from_raw(raw: Vec<Vec<f32>>) -> std::result::Result<Vec<Tensor>, DecodeError> {
    raw.into_iter()
        .map(|v| Tensor::from_slice(&v, v.len(), &Device::Cpu))
        .collect::<Result<Vec<_>>>()
        .map_err(|err| DecodeError::OtherString(err.to_string()))
}

impl<C> Decode<C> for ReplayBuffer {
    fn decode<D: bincode::de::Decoder<Context = C>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, bincode::error::DecodeError> {
        let capacity = usize::decode(decoder)?;
        let states = tensors_from_raw(Vec::decode(decoder)?)?;
        let actions = tensors_from_raw(Vec::decode(decoder)?)?;
        let next_states = tensors_from_raw(Vec::decode(decoder)?)?;
        let rewards: Vec<f32> = Vec::decode(decoder)?;
        let dones: Vec<bool> = Vec::decode(decoder)?;
        let mut buffer = ReplayBuffer::new(capacity);
        for ((((state, action), next_state), reward), done) in states
            .into_iter()
            .zip(actions)
            .zip(next_states)
            .zip(rewards)
            .zip(dones)
        {
            buffer.push(crate::replay_buffer::Transition {
                state,
                action,
                reward,
                next_state,
                done,
            });
        }
        Ok(buffer)
    }
}

impl<'de, C> BorrowDecode<'de, C> for ReplayBuffer {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de, Context = C>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, bincode::error::DecodeError> {
        ReplayBuffer::decode(decoder)
    }
}
