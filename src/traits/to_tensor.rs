use burn::{
    prelude::*,
    tensor::{backend::Backend, BasicOps, Element, TensorData},
};

/// A trait for converting items to tensors
///
/// Implemented for `Vec<T>` to convert batches of `T` to a tensor of dimension `D`.
/// The agent feeds single observations through it as a batch of one. Values are
/// converted to the element type of the target tensor kind.
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B>> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

/// `[len]` tensor, e.g. the one-hot mask of the taken action
impl<B, E, K> ToTensor<B, 1, K> for Vec<E>
where
    B: Backend,
    E: Element,
    K: BasicOps<B>,
{
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 1, K> {
        let len = self.len();
        Tensor::from_data(TensorData::new(self, [len]).convert::<K::Elem>(), device)
    }
}

/// `[batch, A]` tensor from a batch of fixed-size observations
impl<B, E, K, const A: usize> ToTensor<B, 2, K> for Vec<[E; A]>
where
    B: Backend,
    E: Element,
    K: BasicOps<B>,
{
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2, K> {
        let batch_size = self.len();
        let mut flat = Vec::with_capacity(batch_size * A);
        for array in &self {
            flat.extend_from_slice(array);
        }

        Tensor::from_data(TensorData::new(flat, [batch_size, A]).convert::<K::Elem>(), device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    #[test]
    fn test_action_weights_to_tensor_1d() {
        let device = NdArrayDevice::default();
        let mask = vec![0.0_f32, 0.0, 1.0, 0.0];
        let tensor: Tensor<NdArray, 1> = mask.to_tensor(&device);

        assert_eq!(tensor.shape().dims, [4]);
        let tensor_data = tensor.to_data();
        assert_eq!(tensor_data.as_slice::<f32>().unwrap(), &[0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_integer_tensor_kind() {
        let device = NdArrayDevice::default();
        let tensor: Tensor<NdArray, 1, Int> = vec![3_i64, 0, 2].to_tensor(&device);

        assert_eq!(tensor.shape().dims, [3]);
        assert_eq!(tensor.into_data().convert::<i64>().to_vec::<i64>().unwrap(), vec![3, 0, 2]);
    }

    #[test]
    fn test_single_observation_to_batch() {
        let device = NdArrayDevice::default();

        let observation = [0.1_f32, 1.4, -0.2, 0.0, 0.05, -0.01, 0.0, 1.0];
        let tensor: Tensor<NdArray, 2> = vec![observation].to_tensor(&device);

        assert_eq!(tensor.shape().dims, [1, 8]);
        assert_eq!(tensor.to_data().as_slice::<f32>().unwrap(), &observation);
    }

    #[test]
    fn test_observation_batch_is_row_major() {
        let device = NdArrayDevice::default();

        let states = vec![[1.0_f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let tensor: Tensor<NdArray, 2> = states.to_tensor(&device);

        assert_eq!(tensor.shape().dims, [3, 2]);
        assert_eq!(
            tensor.to_data().as_slice::<f32>().unwrap(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }
}
