//! Fixed-size matrix helpers for the Kalman estimator
//!
//! Plain nested arrays with const generic dimensions. No heap, no external
//! linear algebra crate: the largest system solved here is 3 states by
//! 2 measurements.

/// Matrix type using const generics
pub type Matrix<const R: usize, const C: usize> = [[f32; C]; R];

/// Square matrix type
pub type SquareMatrix<const N: usize> = Matrix<N, N>;

/// Column vector type
pub type Vector<const N: usize> = [f32; N];

/// Identity matrix
pub fn identity<const N: usize>() -> SquareMatrix<N> {
    diagonal([1.0; N])
}

/// Diagonal matrix from its diagonal entries
pub fn diagonal<const N: usize>(diag: [f32; N]) -> SquareMatrix<N> {
    let mut m = [[0.0; N]; N];
    for i in 0..N {
        m[i][i] = diag[i];
    }
    m
}

/// Matrix multiplication: A[R×K] × B[K×C]
pub fn multiply<const R: usize, const K: usize, const C: usize>(
    a: &Matrix<R, K>,
    b: &Matrix<K, C>,
) -> Matrix<R, C> {
    let mut result = [[0.0; C]; R];
    for i in 0..R {
        for j in 0..C {
            for k in 0..K {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    result
}

/// Matrix transpose
pub fn transpose<const R: usize, const C: usize>(a: &Matrix<R, C>) -> Matrix<C, R> {
    let mut result = [[0.0; R]; C];
    for i in 0..R {
        for j in 0..C {
            result[j][i] = a[i][j];
        }
    }
    result
}

/// Element-wise sum
pub fn add<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &Matrix<R, C>) -> Matrix<R, C> {
    let mut result = *a;
    for i in 0..R {
        for j in 0..C {
            result[i][j] += b[i][j];
        }
    }
    result
}

/// Element-wise difference
pub fn sub<const R: usize, const C: usize>(a: &Matrix<R, C>, b: &Matrix<R, C>) -> Matrix<R, C> {
    let mut result = *a;
    for i in 0..R {
        for j in 0..C {
            result[i][j] -= b[i][j];
        }
    }
    result
}

/// Matrix-vector product: y = A × x
pub fn matvec<const R: usize, const C: usize>(a: &Matrix<R, C>, x: &Vector<C>) -> Vector<R> {
    let mut y = [0.0; R];
    for i in 0..R {
        for j in 0..C {
            y[i] += a[i][j] * x[j];
        }
    }
    y
}

/// Make matrix symmetric: A = (A + Aᵀ) / 2
///
/// Keeps round-off from slowly skewing the covariance.
pub fn make_symmetric<const N: usize>(m: &mut SquareMatrix<N>) {
    for i in 0..N {
        for j in i + 1..N {
            let avg = (m[i][j] + m[j][i]) * 0.5;
            m[i][j] = avg;
            m[j][i] = avg;
        }
    }
}

/// True when every entry is finite
pub fn is_finite<const R: usize, const C: usize>(m: &Matrix<R, C>) -> bool {
    m.iter().all(|row| row.iter().all(|v| v.is_finite()))
}

/// Diagonal entries
pub fn diag_of<const N: usize>(m: &SquareMatrix<N>) -> Vector<N> {
    let mut d = [0.0; N];
    for i in 0..N {
        d[i] = m[i][i];
    }
    d
}

/// Matrix inversion using Gauss-Jordan elimination with partial pivoting
///
/// Returns `None` if the matrix is singular (pivot below 1e-12).
pub fn invert<const N: usize>(a: &SquareMatrix<N>) -> Option<SquareMatrix<N>> {
    let mut work = *a;
    let mut inv = identity::<N>();

    for k in 0..N {
        let mut pivot_row = k;
        let mut pivot_abs = work[k][k].abs();
        for i in (k + 1)..N {
            if work[i][k].abs() > pivot_abs {
                pivot_abs = work[i][k].abs();
                pivot_row = i;
            }
        }

        if !(pivot_abs > 1e-12) {
            return None;
        }

        if pivot_row != k {
            work.swap(k, pivot_row);
            inv.swap(k, pivot_row);
        }

        let pivot = work[k][k];
        for j in 0..N {
            work[k][j] /= pivot;
            inv[k][j] /= pivot;
        }

        for i in 0..N {
            if i != k {
                let factor = work[i][k];
                for j in 0..N {
                    work[i][j] -= factor * work[k][j];
                    inv[i][j] -= factor * inv[k][j];
                }
            }
        }
    }

    Some(inv)
}
