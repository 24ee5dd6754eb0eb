//! Solidity interfaces of the contracts the wallet-miner talks to.

#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    /// Safe v1.1.1 proxy factory.
    interface IProxyFactory {
        event ProxyCreation(address proxy);

        function createProxy(address masterCopy, bytes data) external returns (address proxy);

        function createProxyWithNonce(
            address masterCopy,
            bytes initializer,
            uint256 saltNonce
        ) external returns (address proxy);
    }

    /// Safe v1.1.1 master copy.
    interface ISafe {
        function setup(
            address[] owners,
            uint256 threshold,
            address to,
            bytes data,
            address fallbackHandler,
            address paymentToken,
            uint256 payment,
            address paymentReceiver
        ) external;
    }

    /// UUPS authorizer guarding which wards may deploy wallets for which aims.
    interface IAuthorizer {
        function init(address[] wards, address[] aims) external;
        function owner() external view returns (address);
        function can(address usr, address aim) external view returns (bool);
        function upgradeToAndCall(address newImplementation, bytes data) external payable;
    }

    /// The subset of ERC-20 the sweeper uses.
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }

    /// Module delegate-called by a freshly set up wallet to sweep a token.
    interface ISweeper {
        function yoink(address receiver, address token) external;
    }
}
