//! Matrix decompositions and matrix functions.
//!
//! The generalized Cholesky decomposition handles symmetric
//! positive-semidefinite input of any rank through diagonal pivoting, which
//! is what the change of basis for the Wishart model needs when the
//! volatility-of-volatility Gram matrix is singular. The square-root helpers
//! come in two flavours: a strict one that rejects matrices outside the PSD
//! cone, and a truncating one used by the Euler baseline.

use crate::{Array, Matrix};
use wsv_core::{
    errors::{Error, Result},
    Real,
};

/// Pivots below this fraction of the largest entry are treated as zero.
const PIVOT_TOLERANCE: Real = 1e-12;

/// Largest admissible entry of the trailing Schur complement, relative to the
/// largest entry of the input.
const RESIDUAL_TOLERANCE: Real = 1e-9;

/// Largest admissible asymmetry, relative to the largest entry of the input.
const SYMMETRY_TOLERANCE: Real = 1e-10;

/// Negative eigenvalues above `-SQRT_TOLERANCE · max|λ|` are rounding noise.
const SQRT_TOLERANCE: Real = 1e-10;

/// Result of a pivoted Cholesky decomposition of a PSD matrix.
///
/// For an input `G` of size `d × d` with rank `n`, the decomposition
/// satisfies
///
/// ```text
/// P G Pᵀ = L Lᵀ,   L = [c; k]
/// ```
///
/// where `c` is `n × n` lower triangular with a positive diagonal, `k` is the
/// `(d − n) × n` residual block and `P` is the permutation with
/// `(P G Pᵀ)[i][j] = G[perm[i]][perm[j]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyDecomposition {
    lower: Matrix,
    permutation: Vec<usize>,
    rank: usize,
}

impl CholeskyDecomposition {
    /// Numerical rank of the decomposed matrix.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Size `d` of the decomposed matrix.
    pub fn dimension(&self) -> usize {
        self.permutation.len()
    }

    /// Pivot order: row `i` of the permuted matrix is row `perm[i]` of the
    /// input.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// The stacked `d × n` factor `[c; k]`.
    pub fn lower(&self) -> &Matrix {
        &self.lower
    }

    /// The `n × n` lower-triangular block `c`.
    pub fn factor(&self) -> Matrix {
        let n = self.rank;
        Matrix::from_fn(n, n, |i, j| self.lower[(i, j)])
    }

    /// The `(d − n) × n` residual block `k`.
    pub fn residual(&self) -> Matrix {
        let n = self.rank;
        let d = self.dimension();
        Matrix::from_fn(d - n, n, |i, j| self.lower[(n + i, j)])
    }

    /// The permutation matrix `P`.
    pub fn permutation_matrix(&self) -> Matrix {
        let d = self.dimension();
        let mut p = Matrix::zeros(d, d);
        for (i, &pi) in self.permutation.iter().enumerate() {
            p[(i, pi)] = 1.0;
        }
        p
    }

    /// Solve `c ζ = rhs` by forward substitution, reading the first `n`
    /// entries of `rhs`.
    pub fn solve_factor(&self, rhs: &[Real]) -> Result<Array> {
        let n = self.rank;
        if rhs.len() < n {
            return Err(Error::vector_len("triangular solve right-hand side", n, rhs.len()));
        }
        let mut zeta = Array::zeros(n);
        for i in 0..n {
            let mut acc = rhs[i];
            for k in 0..i {
                acc -= self.lower[(i, k)] * zeta[k];
            }
            zeta[i] = acc / self.lower[(i, i)];
        }
        Ok(zeta)
    }
}

/// Pivoted ("generalized") Cholesky decomposition of a symmetric PSD matrix.
///
/// At every step the largest remaining diagonal entry is chosen as pivot; the
/// factorization stops once that pivot is negligible, which fixes the rank.
/// Fails with [`Error::Decomposition`] if the input is not symmetric, or if
/// the part left after the last pivot is not negligible (the input was not
/// PSD within tolerance).
pub fn generalized_cholesky(m: &Matrix) -> Result<CholeskyDecomposition> {
    generalized_cholesky_with_scale(m, 0.0)
}

/// [`generalized_cholesky`] with tolerances measured against
/// `max(scale, max|m_ij|)`.
///
/// Use this for a principal block of a larger PSD matrix, passing the
/// largest entry of the whole matrix: a block that is zero up to rounding
/// then has rank zero instead of failing.
pub fn generalized_cholesky_with_scale(m: &Matrix, scale: Real) -> Result<CholeskyDecomposition> {
    let d = m.nrows();
    if !m.is_square() {
        return Err(Error::matrix_shape("generalized Cholesky input", (d, d), m.shape()));
    }
    if m.iter().any(|x| !x.is_finite()) {
        return Err(Error::Decomposition("input contains non-finite entries".into()));
    }
    let scale = max_abs(m).max(scale);
    if !is_symmetric(m, SYMMETRY_TOLERANCE * scale) {
        return Err(Error::Decomposition("input is not symmetric".into()));
    }

    let tol = PIVOT_TOLERANCE * scale;
    let mut work = (m + m.transpose()) * 0.5;
    let mut lower = Matrix::zeros(d, d);
    let mut permutation: Vec<usize> = (0..d).collect();
    let mut rank = 0;

    for j in 0..d {
        let (p, pivot) = (j..d)
            .map(|i| (i, work[(i, i)]))
            .fold((j, Real::NEG_INFINITY), |best, c| if c.1 > best.1 { c } else { best });
        if pivot <= tol {
            break;
        }
        if p != j {
            work.swap_rows(j, p);
            work.swap_columns(j, p);
            lower.swap_rows(j, p);
            permutation.swap(j, p);
        }

        let l_jj = pivot.sqrt();
        lower[(j, j)] = l_jj;
        for i in (j + 1)..d {
            lower[(i, j)] = work[(i, j)] / l_jj;
        }
        for i in (j + 1)..d {
            for k in (j + 1)..=i {
                let v = work[(i, k)] - lower[(i, j)] * lower[(k, j)];
                work[(i, k)] = v;
                work[(k, i)] = v;
            }
        }
        rank += 1;
    }

    let residual_tol = RESIDUAL_TOLERANCE * scale;
    for i in rank..d {
        for k in rank..=i {
            if work[(i, k)].abs() > residual_tol {
                return Err(Error::Decomposition(format!(
                    "matrix is not positive semi-definite: Schur complement entry ({i}, {k}) = {} after rank {rank}",
                    work[(i, k)]
                )));
            }
        }
    }

    Ok(CholeskyDecomposition {
        lower: Matrix::from_fn(d, rank, |i, j| lower[(i, j)]),
        permutation,
        rank,
    })
}

/// Eigenvalue decomposition of a symmetric real matrix.
///
/// Returns `(eigenvalues, eigenvectors)`; column `i` of the eigenvector
/// matrix belongs to eigenvalue `i`. Only the lower triangle is read.
pub fn symmetric_eigen(m: &Matrix) -> Result<(Array, Matrix)> {
    if !m.is_square() {
        return Err(Error::InvalidArgument("matrix must be square".into()));
    }
    let eigen = m.clone().symmetric_eigen();
    Ok((eigen.eigenvalues, eigen.eigenvectors))
}

/// Symmetric PSD square root: the unique PSD `S` with `S S = M`.
///
/// Eigenvalues that are negative only by rounding noise are clipped to zero;
/// anything more negative fails with [`Error::Decomposition`].
pub fn symmetric_sqrt(m: &Matrix) -> Result<Matrix> {
    let (values, vectors) = symmetric_eigen(m)?;
    let scale = values.iter().fold(0.0, |acc: Real, v| acc.max(v.abs()));
    if let Some(worst) = values.iter().copied().find(|&v| v < -SQRT_TOLERANCE * scale) {
        return Err(Error::Decomposition(format!(
            "square root of a matrix with negative eigenvalue {worst}"
        )));
    }
    Ok(rebuild(&values, &vectors))
}

/// Square root of the positive part of a symmetric matrix.
///
/// Negative eigenvalues are set to zero before taking the root ("full
/// truncation"). Returns the root together with the number of eigenvalues
/// that were clipped.
pub fn positive_part_sqrt(m: &Matrix) -> Result<(Matrix, usize)> {
    let (values, vectors) = symmetric_eigen(m)?;
    let clipped = values.iter().filter(|&&v| v < 0.0).count();
    Ok((rebuild(&values, &vectors), clipped))
}

fn rebuild(values: &Array, vectors: &Matrix) -> Matrix {
    let roots = values.map(|v| v.max(0.0).sqrt());
    let scaled = vectors * Matrix::from_diagonal(&roots);
    scaled * vectors.transpose()
}

/// Matrix exponential `e^M` of a square matrix.
pub fn matrix_exp(m: &Matrix) -> Result<Matrix> {
    if !m.is_square() {
        return Err(Error::InvalidArgument("matrix exponential needs a square matrix".into()));
    }
    Ok(m.exp())
}

/// The `d × d` diagonal matrix with ones in the first `n` diagonal entries.
pub fn indicator_identity(d: usize, n: usize) -> Matrix {
    Matrix::from_fn(d, d, |i, j| if i == j && i < n { 1.0 } else { 0.0 })
}

/// `true` if `m` is square and `|m[i][j] − m[j][i]| <= tolerance` everywhere.
pub fn is_symmetric(m: &Matrix, tolerance: Real) -> bool {
    if !m.is_square() {
        return false;
    }
    let d = m.nrows();
    (0..d).all(|i| (0..i).all(|j| (m[(i, j)] - m[(j, i)]).abs() <= tolerance))
}

/// The principal submatrix of `m` on `indices` (rows and columns).
pub fn principal_submatrix(m: &Matrix, indices: &[usize]) -> Matrix {
    let k = indices.len();
    Matrix::from_fn(k, k, |i, j| m[(indices[i], indices[j])])
}

fn max_abs(m: &Matrix) -> Real {
    m.iter().fold(0.0, |acc: Real, x| acc.max(x.abs()))
}
